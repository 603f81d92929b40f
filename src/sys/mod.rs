// 🛡️ The gateway core. One module per component; front-ends only need
// `gateway`, `invocation` and `results`.

pub mod traits;       // Runner + gateway contracts
pub mod secrets;      // Memory hygiene (KeyMaterial)
pub mod credentials;  // Key / known_hosts materialization
pub mod invocation;   // ConnectionProfile + ssh argv
pub mod runner;       // Spawn, deadline, process-group kill
pub mod scripts;      // Remote shell text
pub mod results;      // Exec / binary / artifact outcomes
pub mod gateway;      // execute, archive, fetch
pub mod staging;      // Local download landing zone
