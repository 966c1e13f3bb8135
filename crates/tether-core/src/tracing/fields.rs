//! Span names shared across crates.

pub const SPAN_COMPILE: &str = "tether.compile";
pub const SPAN_DISPATCH: &str = "tether.dispatch";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_names_share_the_log_target_prefix() {
        for name in [SPAN_COMPILE, SPAN_DISPATCH] {
            assert!(name.starts_with("tether."), "{name}");
        }
    }
}
