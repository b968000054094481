//! Test data builders for samples and configs

use powerosd_rs::config::{AppConfig, GapPolicy};
use powerosd_rs::Sample;

/// Builder for creating test Samples
pub struct SampleBuilder {
    voltage: f64,
    current: f64,
    power: Option<f64>,
    energy: f64,
    timestamp: u64,
}

impl SampleBuilder {
    pub fn new() -> Self {
        Self {
            voltage: 5.0,
            current: 0.5,
            power: None,
            energy: 0.0,
            timestamp: 0,
        }
    }

    pub fn voltage(mut self, voltage: f64) -> Self {
        self.voltage = voltage;
        self
    }

    pub fn current(mut self, current: f64) -> Self {
        self.current = current;
        self
    }

    pub fn power(mut self, power: f64) -> Self {
        self.power = Some(power);
        self
    }

    pub fn energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> Sample {
        let sample = Sample::new(self.voltage, self.current, self.timestamp)
            .with_energy(self.energy);
        match self.power {
            Some(power) => sample.with_power(power),
            None => sample,
        }
    }

    /// Render as a BLE JSON notification
    pub fn to_json(&self) -> String {
        let mut json = format!(
            r#"{{"voltage":{},"current":{},"charge":{},"timestamp":{}"#,
            self.voltage, self.current, self.energy, self.timestamp
        );
        if let Some(power) = self.power {
            json.push_str(&format!(r#","power":{}"#, power));
        }
        json.push('}');
        json
    }
}

impl Default for SampleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for pipeline configs
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.history.capacity = capacity;
        self
    }

    pub fn min_current(mut self, min_current: f64) -> Self {
        self.config.normalizer.min_current = min_current;
        self
    }

    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.config.normalizer.gap_policy = policy;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
