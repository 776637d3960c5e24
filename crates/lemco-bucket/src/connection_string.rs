use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;

use crate::BucketError;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const EMULATOR_ACCOUNT: &str = "devstoreaccount1";

/// Parsed form of an Azure Storage connection string
/// (`DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...`).
#[derive(Clone, PartialEq, Eq)]
pub struct AzureConnectionString {
    pub account_name: String,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    pub protocol: String,
    pub endpoint_suffix: String,
    pub blob_endpoint: Option<String>,
    pub use_emulator: bool,
}

impl AzureConnectionString {
    pub fn parse(raw: &str) -> Result<Self, BucketError> {
        let mut account_name = None;
        let mut account_key = None;
        let mut sas_token = None;
        let mut protocol = None;
        let mut endpoint_suffix = None;
        let mut blob_endpoint = None;
        let mut use_emulator = false;

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                return Err(BucketError::Configuration(format!(
                    "connection string segment '{segment}' is not a Key=Value pair"
                )));
            };
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "sharedaccesssignature" => sas_token = Some(value),
                "defaultendpointsprotocol" => protocol = Some(value),
                "endpointsuffix" => endpoint_suffix = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "usedevelopmentstorage" => use_emulator = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if use_emulator {
            return Ok(Self {
                account_name: EMULATOR_ACCOUNT.to_string(),
                account_key: None,
                sas_token: None,
                protocol: "http".to_string(),
                endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string(),
                blob_endpoint: None,
                use_emulator: true,
            });
        }

        let account_name = account_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BucketError::Configuration("connection string has no AccountName".into()))?;

        if account_key.is_none() && sas_token.is_none() {
            return Err(BucketError::Configuration(
                "connection string needs an AccountKey or SharedAccessSignature".into(),
            ));
        }

        Ok(Self {
            account_name,
            account_key,
            sas_token,
            protocol: protocol.unwrap_or_else(|| "https".to_string()),
            endpoint_suffix: endpoint_suffix.unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string()),
            blob_endpoint,
            use_emulator: false,
        })
    }

    /// Blob endpoint override, if the connection string points anywhere other than the
    /// public Azure cloud.
    pub fn endpoint_override(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        if self.endpoint_suffix != DEFAULT_ENDPOINT_SUFFIX {
            return Some(format!(
                "{}://{}.blob.{}",
                self.protocol, self.account_name, self.endpoint_suffix
            ));
        }
        None
    }

    /// SAS query parameters as percent-decoded key/value pairs. The Azure client
    /// re-encodes them when it builds request URLs.
    pub fn sas_pairs(&self) -> Result<Vec<(String, String)>, BucketError> {
        let Some(sas) = &self.sas_token else {
            return Ok(Vec::new());
        };
        sas.trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| Ok((decode_component(key)?, decode_component(value)?)))
            .collect()
    }
}

fn decode_component(raw: &str) -> Result<String, BucketError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| BucketError::Configuration(format!("SharedAccessSignature is not valid UTF-8: {err}")))
}

impl fmt::Debug for AzureConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("AzureConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &redact(&self.account_key))
            .field("sas_token", &redact(&self.sas_token))
            .field("protocol", &self.protocol)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("use_emulator", &self.use_emulator)
            .finish()
    }
}

impl FromStr for AzureConnectionString {
    type Err = BucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_connection_string() {
        let parsed = AzureConnectionString::parse(
            "DefaultEndpointsProtocol=https;AccountName=lemcostore;AccountKey=abc123==;EndpointSuffix=core.windows.net",
        )
        .expect("parse connection string");

        assert_eq!(parsed.account_name, "lemcostore");
        assert_eq!(parsed.account_key.as_deref(), Some("abc123=="));
        assert_eq!(parsed.protocol, "https");
        assert!(!parsed.use_emulator);
        assert_eq!(parsed.endpoint_override(), None);
    }

    #[test]
    fn sovereign_cloud_suffix_produces_endpoint() {
        let parsed: AzureConnectionString =
            "AccountName=lemco;AccountKey=k;EndpointSuffix=core.chinacloudapi.cn"
                .parse()
                .expect("parse");
        assert_eq!(
            parsed.endpoint_override().as_deref(),
            Some("https://lemco.blob.core.chinacloudapi.cn")
        );
    }

    #[test]
    fn development_storage_uses_emulator() {
        let parsed = AzureConnectionString::parse("UseDevelopmentStorage=true").expect("parse");
        assert!(parsed.use_emulator);
        assert_eq!(parsed.account_name, "devstoreaccount1");
    }

    #[test]
    fn blob_endpoint_wins_over_suffix() {
        let parsed = AzureConnectionString::parse(
            "AccountName=dev;AccountKey=k;BlobEndpoint=http://127.0.0.1:10000/dev/",
        )
        .expect("parse");
        assert_eq!(
            parsed.endpoint_override().as_deref(),
            Some("http://127.0.0.1:10000/dev")
        );
    }

    #[test]
    fn sas_token_is_split_into_decoded_pairs() {
        let parsed = AzureConnectionString::parse(
            "AccountName=lemco;SharedAccessSignature=?sv=2022-11-02&sig=abc%3D",
        )
        .expect("parse");
        assert_eq!(
            parsed.sas_pairs().expect("sas pairs"),
            vec![
                ("sv".to_string(), "2022-11-02".to_string()),
                ("sig".to_string(), "abc=".to_string())
            ]
        );
    }

    #[test]
    fn encoded_signature_characters_are_decoded() {
        let parsed = AzureConnectionString::parse(
            "AccountName=lemco;SharedAccessSignature=sv=2022-11-02&se=2026-01-01T00%3A00%3A00Z&sig=a%2Bb%2Fc%3D",
        )
        .expect("parse");
        let pairs = parsed.sas_pairs().expect("sas pairs");
        assert_eq!(pairs[1], ("se".to_string(), "2026-01-01T00:00:00Z".to_string()));
        assert_eq!(pairs[2], ("sig".to_string(), "a+b/c=".to_string()));
    }

    #[test]
    fn invalid_utf8_in_signature_is_rejected() {
        let parsed = AzureConnectionString::parse("AccountName=lemco;SharedAccessSignature=sig=%FF")
            .expect("parse");
        assert!(matches!(parsed.sas_pairs(), Err(BucketError::Configuration(_))));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let parsed = AzureConnectionString::parse("AccountName=lemco;AccountKey=supersecret")
            .expect("parse");
        let rendered = format!("{parsed:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn rejects_missing_account() {
        let err = AzureConnectionString::parse("AccountKey=abc").unwrap_err();
        assert!(matches!(err, BucketError::Configuration(_)));
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = AzureConnectionString::parse("AccountName=lemco").unwrap_err();
        assert!(matches!(err, BucketError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_segment() {
        let err = AzureConnectionString::parse("AccountName=lemco;garbage").unwrap_err();
        assert!(matches!(err, BucketError::Configuration(_)));
    }
}
