use burn::prelude::*;

/// Owns the device and random seed for a run.
///
/// Built once per command and passed by reference to train,
/// predict and score, so nothing depends on process-wide state.
/// Constructing a session seeds the backend's RNG, which makes
/// weight initialisation reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct Session<B: Backend> {
    device: B::Device,
    seed:   u64,
}

impl<B: Backend> Session<B> {
    pub fn new(device: B::Device, seed: u64) -> Self {
        B::seed(seed);
        tracing::debug!("Session on {:?} with seed {}", device, seed);
        Self { device, seed }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_seed_is_kept() {
        let session = Session::<NdArray>::new(Default::default(), 42);
        assert_eq!(session.seed(), 42);
        assert_eq!(session.device(), &Default::default());
    }
}
