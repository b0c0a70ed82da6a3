use crate::entities::{OrderStatus, PaymentStatus};
use crate::payments::ProviderPaymentStatus;

/// Maps a provider payment status onto the order and payment statuses it implies.
///
/// `None` means the event carries no state change for us.
pub fn map_provider_status(status: &ProviderPaymentStatus) -> Option<(OrderStatus, PaymentStatus)> {
    match status {
        ProviderPaymentStatus::Captured => Some((OrderStatus::Paid, PaymentStatus::Paid)),
        ProviderPaymentStatus::Failed => Some((OrderStatus::Failed, PaymentStatus::Failed)),
        ProviderPaymentStatus::Voided | ProviderPaymentStatus::Refunded => {
            Some((OrderStatus::Cancelled, PaymentStatus::Refunded))
        }
        ProviderPaymentStatus::Unrecognized(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CAPTURED", Some((OrderStatus::Paid, PaymentStatus::Paid)))]
    #[case("FAILED", Some((OrderStatus::Failed, PaymentStatus::Failed)))]
    #[case("VOIDED", Some((OrderStatus::Cancelled, PaymentStatus::Refunded)))]
    #[case("REFUNDED", Some((OrderStatus::Cancelled, PaymentStatus::Refunded)))]
    #[case("PENDING", None)]
    #[case("AUTHORIZED", None)]
    #[case("PARTIALLY_REFUNDED", None)]
    #[case("captured", None)]
    #[case("", None)]
    fn maps_provider_tokens(
        #[case] token: &str,
        #[case] expected: Option<(OrderStatus, PaymentStatus)>,
    ) {
        assert_eq!(map_provider_status(&ProviderPaymentStatus::from(token)), expected);
    }
}
