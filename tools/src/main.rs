//! dedupe-runner: headless driver for the bank account dedupe engine.
//!
//! Usage:
//!   dedupe-runner --db ledger.db
//!   dedupe-runner --db ledger.db --fix-dupe all --fix-ref 12,17
//!   dedupe-runner --db ledger.db --ipc-mode

use anyhow::Result;
use chrono::NaiveDate;
use dedupe_core::{
    command::{DedupeRequest, Targets},
    config::DedupeConfig,
    engine::{DedupeEngine, DedupeRun},
    model::{Account, BankTx, Reference},
    scanner::{FindingBucket, ScanReport},
    store::DedupeStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Scan,
    MergeAccounts {
        targets: Targets,
    },
    DeleteReferences {
        targets: Targets,
    },
    Run {
        #[serde(default)]
        fix_dupe: Option<String>,
        #[serde(default)]
        fix_ref: Option<String>,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let demo = args.iter().any(|a| a == "--demo");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir");
    let fix_dupe = arg_value(&args, "--fix-dupe");
    let fix_ref = arg_value(&args, "--fix-ref");

    let config = match data_dir {
        Some(dir) => DedupeConfig::load(dir)?,
        None => DedupeConfig::default(),
    };

    // For :memory: use a shared-memory URI so the collaborators'
    // connections see the same database as the engine.
    let store = if db == ":memory:" {
        DedupeStore::in_memory()?
    } else {
        DedupeStore::open(db)?
    };
    store.migrate()?;
    log::info!("store ready at {db}");
    if demo {
        seed_demo(&store)?;
    }

    let mut engine = DedupeEngine::build(config, store)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        println!("dedupe-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {}", data_dir.unwrap_or("(defaults)"));
        println!();
        let request = DedupeRequest::from_params(fix_dupe, fix_ref);
        let run = engine.run(&request)?;
        print_summary(&run);
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut DedupeEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("ipc: unreadable command: {e}");
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Scan => serde_json::to_value(engine.scan()?)?,
            IpcCommand::MergeAccounts { targets } => {
                let request = DedupeRequest {
                    merge_accounts: Some(targets),
                    delete_references: None,
                };
                serde_json::to_value(engine.run(&request)?)?
            }
            IpcCommand::DeleteReferences { targets } => {
                let request = DedupeRequest {
                    merge_accounts: None,
                    delete_references: Some(targets),
                };
                serde_json::to_value(engine.run(&request)?)?
            }
            IpcCommand::Run { fix_dupe, fix_ref } => {
                let request = DedupeRequest::from_params(fix_dupe.as_deref(), fix_ref.as_deref());
                serde_json::to_value(engine.run(&request)?)?
            }
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(run: &DedupeRun) {
    for msg in &run.messages {
        println!("[{:?}] {}: {}", msg.level, msg.title, msg.text);
    }
    if !run.messages.is_empty() {
        println!();
    }
    print_report(&run.report);
}

fn print_report(report: &ScanReport) {
    print_bucket("DUPLICATE REFERENCES", &report.reference_duplicates);
    print_bucket("DUPLICATE ACCOUNTS", &report.account_duplicates);
    print_bucket("ACCOUNT CONFLICTS", &report.account_conflicts);
}

fn print_bucket(title: &str, bucket: &FindingBucket) {
    println!("=== {title} ({}) ===", bucket.len());
    if bucket.is_empty() {
        println!("  (none)");
    }
    for f in bucket.iter() {
        let owner = match &f.contact {
            Some(c) => c.display_name.clone(),
            None => format!("{} contacts", f.contacts.len()),
        };
        let last_change = f
            .last_change
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  #{:<6} {:<28} {:<8} rows={} accounts={} | {owner} | {last_change}",
            f.reference_id, f.reference, f.reference_type, f.duplicate_count, f.account_count
        );
    }
    println!();
}

/// Small ledger with one finding of each severity.
fn seed_demo(store: &DedupeStore) -> Result<()> {
    const IBAN: i64 = 1;
    let group = DedupeConfig::default().reference_type_group;
    store.insert_option_value(&group, IBAN, "IBAN")?;

    let alice = store.insert_contact("Alice Example", "Individual")?;
    let bob = store.insert_contact("Bob Example", "Individual")?;

    let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0));

    let mut a1 = Account::new(0);
    a1.contact_id = Some(alice);
    a1.data_parsed.insert("iban".into(), "DE1".into());
    a1.created_date = day(2020, 1, 1);
    let a1 = store.insert_account(&a1)?;

    let mut a2 = Account::new(0);
    a2.contact_id = Some(alice);
    a2.data_parsed.insert("city".into(), "Berlin".into());
    a2.created_date = day(2019, 6, 1);
    let a2 = store.insert_account(&a2)?;

    let mut b1 = Account::new(0);
    b1.contact_id = Some(bob);
    let b1 = store.insert_account(&b1)?;

    for (reference, account_id) in [
        ("REF-X", a1),
        ("REF-X", a2),
        ("DE02100100109307118603", b1),
        ("DE02100100109307118603", b1),
        ("REF-SHARED", a1),
        ("REF-SHARED", b1),
    ] {
        store.insert_reference(&Reference {
            id: 0,
            reference: reference.into(),
            reference_type_id: IBAN,
            account_id,
        })?;
    }

    store.insert_bank_tx(&BankTx {
        id: 0,
        bank_reference: "DEMO-TX-1".into(),
        amount: 42.0,
        account_id: Some(a2),
        party_account_id: Some(b1),
    })?;
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
