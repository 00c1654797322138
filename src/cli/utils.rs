use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::models::Order;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// One order as printed by `orders check`
pub fn order_lines(index: usize, order: &Order) -> Vec<String> {
    let shipping = &order.shipping_info;
    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
    vec![
        format!("{}. Order ID: {}", index + 1, order.id),
        format!("   Customer: {}", or_na(&shipping.full_name)),
        format!("   Email: {}", or_na(&shipping.email)),
        format!("   Phone: {}", or_na(&shipping.phone)),
        format!("   Status: {}", order.status.as_str()),
        format!("   Total: {}đ", order.total_price),
        format!("   Created: {}", order.created_at.to_rfc3339()),
    ]
}

/// Compact summary for JSON output
pub fn order_summary(order: &Order) -> Value {
    json!({
        "id": order.id,
        "customer": order.shipping_info.full_name,
        "email": order.shipping_info.email,
        "status": order.status,
        "totalPrice": order.total_price,
        "createdAt": order.created_at,
    })
}
