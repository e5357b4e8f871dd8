#[derive(Copy, Clone, Debug)]
pub struct TransactionLabels {
    pub success: &'static str,
    pub error: &'static str,
    pub latency: &'static str,
}

#[macro_export]
macro_rules! generate_labels {
    ($base_name:ident) => {
        $crate::TransactionLabels {
            success: concat!("stampede_", stringify!($base_name), "_success"),
            error: concat!("stampede_", stringify!($base_name), "_error"),
            latency: concat!("stampede_", stringify!($base_name), "_latency"),
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn labels_are_prefixed_by_name() {
        let labels = generate_labels!(post_endpoint);
        assert_eq!(labels.success, "stampede_post_endpoint_success");
        assert_eq!(labels.error, "stampede_post_endpoint_error");
        assert_eq!(labels.latency, "stampede_post_endpoint_latency");
    }
}
