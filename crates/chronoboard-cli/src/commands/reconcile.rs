use super::{open_board, print_json};

pub fn run(dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let board = open_board()?;

    if dry_run {
        let plan = board.plan_reconcile()?;
        tracing::info!(pending = plan.len(), "dry run, nothing written");
        print_json(&plan)?;
        return Ok(());
    }

    let report = board.reconcile()?;
    tracing::info!(failed = report.failed.len(), "{}", report.message());
    print_json(&report)?;
    Ok(())
}
