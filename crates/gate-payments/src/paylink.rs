//! Payment Link Construction
//!
//! Builds the quickpay redirect URL the beneficiary opens to pay. The query
//! parameter names are the processor's contract.

use gate_core::Tenant;
use url::form_urlencoded;

const QUICKPAY_URL: &str = "https://yoomoney.ru/quickpay/confirm.xml";

/// Redirect URL embedding the tenant's receiver account, price, the payment
/// label, and where the processor sends the user after paying.
pub fn payment_link(tenant: &Tenant, label: &str, beneficiary: &str, success_url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("quickpay-form", "shop")
        .append_pair("paymentType", "AC")
        .append_pair(
            "targets",
            &format!("Subscription payment for user_id={beneficiary}"),
        )
        .append_pair("sum", &tenant.price.to_string())
        .append_pair("label", label)
        .append_pair("receiver", &tenant.receiver)
        .append_pair("successURL", success_url)
        .finish();

    format!("{QUICKPAY_URL}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn link_embeds_contract_parameters() {
        let tenant = Tenant {
            bot_token: "t".into(),
            receiver: "410011000000000".into(),
            notification_secret: "s".into(),
            channel_id: -100,
            price: dec!(600.00),
            description: "{price}".into(),
            crypto_secret: None,
        };

        let link = payment_link(&tenant, "lbl-1", "555", "https://t.me/examplebot");

        assert!(link.starts_with(QUICKPAY_URL));
        assert!(link.contains("quickpay-form=shop"));
        assert!(link.contains("paymentType=AC"));
        assert!(link.contains("sum=600.00"));
        assert!(link.contains("label=lbl-1"));
        assert!(link.contains("receiver=410011000000000"));
        assert!(link.contains("user_id%3D555"));
        assert!(link.contains("successURL=https%3A%2F%2Ft.me%2Fexamplebot"));
    }
}
