use burn::{
    module::AutodiffModule,
    optim::{Optimizer, RmsPropConfig},
    tensor::backend::AutodiffBackend,
};

pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

/// RMSProp settings plus the learning rate handed to every step.
///
/// rho (burn's `alpha`) = 0.9, epsilon = 1e-7, no momentum. The
/// learning rate is not range-checked.
#[derive(Clone)]
pub struct Rmsprop {
    pub config:        RmsPropConfig,
    pub learning_rate: f64,
}

pub fn get_optimizer(learning_rate: f64) -> Rmsprop {
    Rmsprop {
        config: RmsPropConfig::new()
            .with_alpha(0.9)
            .with_epsilon(1e-7)
            .with_momentum(0.0),
        learning_rate,
    }
}

impl Default for Rmsprop {
    fn default() -> Self {
        get_optimizer(DEFAULT_LEARNING_RATE)
    }
}

impl Rmsprop {
    pub fn init<B, M>(&self) -> impl Optimizer<M, B>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        self.config.init::<B, M>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_rate_is_kept() {
        assert_eq!(get_optimizer(0.05).learning_rate, 0.05);
        assert_eq!(Rmsprop::default().learning_rate, DEFAULT_LEARNING_RATE);
        // no bounds check
        assert_eq!(get_optimizer(-1.0).learning_rate, -1.0);
    }

    #[test]
    fn test_rmsprop_settings() {
        let opt = get_optimizer(0.01);
        let settings = serde_json::to_value(&opt.config).unwrap();
        let field = |name: &str| settings[name].as_f64().unwrap();

        assert!((field("alpha") - 0.9).abs() < 1e-6);
        assert!((field("epsilon") - 1e-7).abs() < 1e-12);
        assert_eq!(field("momentum"), 0.0);
        assert_eq!(settings["centered"], serde_json::Value::Bool(false));
    }
}
