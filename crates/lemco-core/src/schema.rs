//! Column names of the Lemco logistics extract and the star-schema projections built from it.

use polars::prelude::{Column, DataFrame, DataType, StringChunked};

use crate::error::{PipelineError, Result};

pub const TRANSACTION_ID: &str = "Transaction_ID";
pub const DATE: &str = "Date";
pub const CUSTOMER_ID: &str = "Customer_ID";
pub const CUSTOMER_NAME: &str = "Customer_Name";
pub const CUSTOMER_PHONE: &str = "Customer_Phone";
pub const CUSTOMER_EMAIL: &str = "Customer_Email";
pub const CUSTOMER_ADDRESS: &str = "Customer_Address";
pub const PRODUCT_ID: &str = "Product_ID";
pub const QUANTITY: &str = "Quantity";
pub const UNIT_PRICE: &str = "Unit_Price";
pub const TOTAL_COST: &str = "Total_Cost";
pub const DISCOUNT_RATE: &str = "Discount_Rate";
pub const PRODUCT_TITLE: &str = "Product_List_Title";
pub const SALES_CHANNEL: &str = "Sales_Channel";
pub const ORDER_PRIORITY: &str = "Order_Priority";
pub const WAREHOUSE_CODE: &str = "Warehouse_Code";
pub const SHIP_MODE: &str = "Ship_Mode";
pub const DELIVERY_STATUS: &str = "Delivery_Status";
pub const CUSTOMER_SATISFACTION: &str = "Customer_Satisfaction";
pub const ITEM_RETURNED: &str = "Item_Returned";
pub const RETURN_REASON: &str = "Return_Reason";
pub const PAYMENT_TYPE: &str = "Payment_Type";
pub const TAXABLE: &str = "Taxable";
pub const REGION: &str = "Region";
pub const COUNTRY: &str = "Country";

/// Every column the extract is expected to carry, in header order.
pub const SOURCE_COLUMNS: [&str; 25] = [
    TRANSACTION_ID,
    DATE,
    CUSTOMER_ID,
    CUSTOMER_NAME,
    CUSTOMER_PHONE,
    CUSTOMER_EMAIL,
    CUSTOMER_ADDRESS,
    PRODUCT_ID,
    QUANTITY,
    UNIT_PRICE,
    TOTAL_COST,
    DISCOUNT_RATE,
    PRODUCT_TITLE,
    SALES_CHANNEL,
    ORDER_PRIORITY,
    WAREHOUSE_CODE,
    SHIP_MODE,
    DELIVERY_STATUS,
    CUSTOMER_SATISFACTION,
    ITEM_RETURNED,
    RETURN_REASON,
    PAYMENT_TYPE,
    TAXABLE,
    REGION,
    COUNTRY,
];

pub const CUSTOMER_KEY: [&str; 5] = [
    CUSTOMER_ID,
    CUSTOMER_NAME,
    CUSTOMER_PHONE,
    CUSTOMER_EMAIL,
    CUSTOMER_ADDRESS,
];

/// Price, quantity and discount are part of the key, so one product id can yield several
/// rows (one per observed line-item variant). This mirrors the source model as-is.
pub const PRODUCT_KEY: [&str; 6] = [
    PRODUCT_ID,
    QUANTITY,
    UNIT_PRICE,
    TOTAL_COST,
    DISCOUNT_RATE,
    PRODUCT_TITLE,
];

pub const FACT_COLUMNS: [&str; 16] = [
    TRANSACTION_ID,
    DATE,
    CUSTOMER_ID,
    PRODUCT_ID,
    SALES_CHANNEL,
    ORDER_PRIORITY,
    WAREHOUSE_CODE,
    SHIP_MODE,
    DELIVERY_STATUS,
    CUSTOMER_SATISFACTION,
    ITEM_RETURNED,
    RETURN_REASON,
    PAYMENT_TYPE,
    TAXABLE,
    REGION,
    COUNTRY,
];

/// Look up a column, mapping absence to [`PipelineError::MissingColumn`].
pub fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
    })
}

pub fn require_all<'a>(df: &'a DataFrame, names: &[&str]) -> Result<Vec<&'a Column>> {
    names.iter().map(|name| require(df, name)).collect()
}

/// View any column as text; non-string columns are cast.
pub(crate) fn string_values(column: &Column) -> Result<StringChunked> {
    let column = column.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}
