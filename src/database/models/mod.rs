pub mod category;
pub mod order;
pub mod product;
pub mod settings;
pub mod user;

pub use category::Category;
pub use order::{
    OrderItem, Order, OrderStatus, OtherShippingInfo, PaymentResult, ProductLink, ProductRef,
    RecentOrder, ShippingInfo, UserRef,
};
pub use product::{
    CategoryRef, ImageVariant, LowStockProduct, MainCategory, Product, ProductStatus,
    ProductSummary, ProductTypeImage, Rating, StockLevels, UnitOption,
};
pub use settings::Settings;
pub use user::{Address, AddressUpdate, User};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A TEXT column held a value outside the enum it maps to
#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Accept numbers that arrive either as JSON numbers or numeric strings
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0.0),
        Raw::Null(()) => 0.0,
    })
}

pub(crate) fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_f64(deserializer).map(|n| n.trunc() as i32)
}
