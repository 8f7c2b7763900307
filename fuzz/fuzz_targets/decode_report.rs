#![no_main]

use blockchain_consensus::{ConsensusReport, SimulationConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(report) = ConsensusReport::from_json(s) {
        let json = report.to_json().unwrap();
        assert_eq!(ConsensusReport::from_json(&json).unwrap(), report);
    }
    if let Ok(config) = SimulationConfig::from_toml_str(s) {
        let _ = config.validate();
    }
});
