//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mininote_core` linkage.
//! - Report the schema versions this build migrates to.

use mininote_core::db::migrations::latest_version;
use mininote_core::db::Schema;

fn main() {
    println!("mininote_core ping={}", mininote_core::ping());
    println!("mininote_core version={}", mininote_core::core_version());
    for schema in [Schema::Notes, Schema::Settings] {
        println!(
            "mininote_core schema={} version={}",
            schema.label(),
            latest_version(schema)
        );
    }
}
