use god_storage::GodError;
use std::path::Path;

pub fn handle(content_dir: &Path) -> god_storage::Result<()> {
    let report = god_storage::verify_container(content_dir)?;

    if report.is_ok() {
        println!(
            "OK: {} blocks across {} sub-hash-tables",
            report.blocks, report.sht_count
        );
        Ok(())
    } else {
        println!(
            "FAILED: {} damaged sub-hash-tables, master table ok: {}",
            report.bad_shts.len(),
            report.master_ok
        );
        for slot in &report.bad_shts {
            println!("  sub-hash-table {slot} does not match its payload");
        }
        Err(GodError::VerificationFailed {
            damaged: report.bad_shts.len(),
            master_ok: report.master_ok,
        })
    }
}
