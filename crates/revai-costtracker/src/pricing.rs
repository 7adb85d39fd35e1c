use std::collections::HashMap;

/// Fixed-point currency amount in millionths of a currency unit.
///
/// Internal accounting uses this integer type exclusively to avoid the
/// floating-point drift that repeated addition of per-call costs would
/// otherwise accumulate in `spent`.
pub type MicroUnits = i64;

const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Converts a currency amount (e.g. dollars) to micro-units, rounding to
/// the nearest micro-unit.
pub fn to_micros(currency: f64) -> MicroUnits {
    (currency * MICROS_PER_UNIT).round() as MicroUnits
}

/// Converts micro-units back to a currency amount for display/reporting.
pub fn from_micros(micros: MicroUnits) -> f64 {
    micros as f64 / MICROS_PER_UNIT
}

/// Per-1000-token input/output rates for one provider, in micro-units.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRate {
    pub input_rate_per_1k: MicroUnits,
    pub output_rate_per_1k: MicroUnits,
}

/// Static table of provider pricing, keyed by provider name.
///
/// Built once at startup via [`crate::CostTrackerConfigBuilder::pricing`] and
/// never mutated afterward. The `local` provider always prices at zero.
#[derive(Debug, Clone)]
pub struct PricingTable {
    rates: HashMap<String, ProviderRate>,
}

impl PricingTable {
    pub fn new() -> Self {
        let mut rates = HashMap::new();
        rates.insert("local".to_string(), ProviderRate::default());
        Self { rates }
    }

    /// Sets the per-1000-token rates for `provider`, in currency units.
    pub fn set_rate(
        &mut self,
        provider: impl Into<String>,
        input_rate_per_1k: f64,
        output_rate_per_1k: f64,
    ) {
        self.rates.insert(
            provider.into(),
            ProviderRate {
                input_rate_per_1k: to_micros(input_rate_per_1k),
                output_rate_per_1k: to_micros(output_rate_per_1k),
            },
        );
    }

    /// Computes the cost of a call in micro-units.
    ///
    /// # Panics
    ///
    /// Panics if `provider` has no entry in the table. A missing provider is
    /// a startup configuration bug, not a runtime error — callers should
    /// validate provider coverage via `CoordinatorConfig::validate` before
    /// any job reaches this path.
    pub fn cost_micros(&self, provider: &str, input_tokens: u64, output_tokens: u64) -> MicroUnits {
        let rate = self
            .rates
            .get(provider)
            .unwrap_or_else(|| panic!("pricing table has no entry for provider {provider:?}"));
        (input_tokens as i64 * rate.input_rate_per_1k
            + output_tokens as i64 * rate.output_rate_per_1k
            + 500)
            / 1000
    }

    /// Whether `provider` has a pricing entry.
    pub fn has_provider(&self, provider: &str) -> bool {
        self.rates.contains_key(provider)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_is_free() {
        let table = PricingTable::new();
        assert_eq!(table.cost_micros("local", 10_000, 5_000), 0);
    }

    #[test]
    fn computes_cost_from_rates() {
        let mut table = PricingTable::new();
        table.set_rate("openai", 0.01, 0.03);

        // 2000 input tokens @ $0.01/1k + 1000 output tokens @ $0.03/1k = $0.02 + $0.03 = $0.05
        let cost = table.cost_micros("openai", 2000, 1000);
        assert_eq!(from_micros(cost), 0.05);
    }

    #[test]
    #[should_panic(expected = "no entry")]
    fn missing_provider_panics() {
        let table = PricingTable::new();
        table.cost_micros("anthropic", 1, 1);
    }

    #[test]
    fn micro_unit_round_trip() {
        assert_eq!(from_micros(to_micros(1.234567)), 1.234567);
    }
}
