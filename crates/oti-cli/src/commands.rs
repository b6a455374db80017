use std::path::Path;

use oti_migrate::{
    ComponentMappingTable, IntentDescriptor, MappingFile, MigrationEngine, RecordAction,
    RecordMatcher, RunSummary, REMAP_TARGET_VERSION,
};
use oti_store::{RecordStore, SqliteError, SqliteStore, StoredRecord, VersionStore};
use serde_json::json;

use crate::launcher::Launcher;

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

/// `oti run --db <db> --config <toml>` — Apply the component mapping once.
///
/// The launcher database is never created. With `--prefs` the version lives
/// in that (private) file; without it, in the launcher database itself.
pub fn run(db_path: &str, prefs_path: Option<&str>, config_path: &str, dry_run: bool) -> Result {
    let mapping = MappingFile::load(config_path)?;
    let table = mapping.table()?;

    if dry_run {
        return plan(db_path, prefs_path, &table);
    }

    let mut prefs = match prefs_path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_existing(db_path)?,
    };
    let mut launcher = Launcher::open(Path::new(db_path));

    println!("Mapping: {config_path} ({} entries)", table.len());
    let engine = MigrationEngine::with_mapping(table, mapping.engine);
    let summary = engine.run(&mut prefs, &mut launcher)?;
    print_summary(&summary);
    Ok(())
}

/// Read-only version lookup; a file that does not exist yet reads as v0.
fn read_version(path: &str) -> std::result::Result<u32, SqliteError> {
    if !Path::new(path).exists() {
        return Ok(0);
    }
    Ok(SqliteStore::open_read_only(path)?.get())
}

fn plan(db_path: &str, prefs_path: Option<&str>, table: &ComponentMappingTable) -> Result {
    let version = read_version(prefs_path.unwrap_or(db_path))?;
    println!("Mapping version: v{version}");
    if version >= REMAP_TARGET_VERSION {
        println!("  Already up to date. Nothing to do.");
        return Ok(());
    }
    if table.is_empty() {
        println!("  Mapping table is empty; the version would advance with no changes.");
        return Ok(());
    }

    let launcher = SqliteStore::open_read_only(db_path)?;
    let matcher = RecordMatcher::new(table);
    let rows = launcher.query_all()?;
    let mut changes = 0usize;

    println!("Dry run over {} favorites:", format_num(rows.len() as u64));
    for row in &rows {
        let Some(intent) = row.intent.as_deref().filter(|i| !i.is_empty()) else {
            continue;
        };
        match matcher.plan(intent) {
            Ok(actions) => {
                for action in actions {
                    changes += 1;
                    match action {
                        RecordAction::Update(uri) => {
                            println!("  {:>6}  rename  {}", row.id, truncate(&uri, 72))
                        }
                        RecordAction::Delete => println!("  {:>6}  delete", row.id),
                    }
                }
            }
            Err(e) => println!("  {:>6}  skip    ({e})", row.id),
        }
    }

    if changes == 0 {
        println!("  (no favorites match)");
    }
    println!();
    println!("Dry run: no changes written.");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.already_current() {
        println!(
            "Mapping version: v{} (already up to date)",
            summary.from_version
        );
        return;
    }

    println!(
        "Mapping version: v{} -> v{}",
        summary.from_version, summary.to_version
    );
    let records = &summary.records;
    if records.store_unavailable {
        println!("  Launcher favorites were unavailable; nothing was remapped.");
    }
    println!("  Scanned:  {:>8}", format_num(records.scanned as u64));
    println!("  Renamed:  {:>8}", format_num(records.renamed as u64));
    println!("  Deleted:  {:>8}", format_num(records.deleted as u64));
    println!("  Skipped:  {:>8}", format_num(records.skipped as u64));
    println!("  Failed:   {:>8}", format_num(records.failed as u64));
}

/// `oti status --db <db>` — Show the mapping version and favorites statistics.
pub fn status(db_path: &str, prefs_path: Option<&str>) -> Result {
    let store = SqliteStore::open_read_only(db_path)?;
    let info = store.favorites_info()?;
    let size = store.file_size()?;
    let journal = store.journal_mode()?;

    let version = match prefs_path {
        Some(path) => SqliteStore::open_read_only(path)?.load_version()?,
        None => info.mapping_version,
    };

    println!("Database: {db_path} (SQLite, {journal} mode)");
    println!("Size: {}", format_bytes(size));
    match version {
        Some(v) => println!("Mapping version: v{v}"),
        None => println!("Mapping version: (never set, reads as v0)"),
    }
    println!();
    println!("  {:<20} {:>10}", "Favorites", format_num(info.total));
    println!("  {:<20} {:>10}", "With intent", format_num(info.with_intent));
    println!();

    Ok(())
}

/// `oti inspect --db <db> [id]` — List favorites or show one parsed intent.
pub fn inspect(db_path: &str, id: Option<i64>, as_json: bool) -> Result {
    let store = SqliteStore::open_read_only(db_path)?;
    let rows = store.query_all()?;

    match id {
        Some(id) => match rows.iter().find(|r| r.id == id) {
            Some(row) => inspect_record(&store, row, as_json),
            None => {
                eprintln!("Favorite {id} not found");
                Ok(())
            }
        },
        None => inspect_list(&rows),
    }
}

fn inspect_list(rows: &[StoredRecord]) -> Result {
    if rows.is_empty() {
        println!("  (no favorites)");
        return Ok(());
    }

    println!("  {:>6}  {:<40}  {:<30}", "Id", "Component", "Action");
    println!("  {}", "-".repeat(80));
    for row in rows {
        let (component, action) = match row.intent.as_deref().map(IntentDescriptor::parse) {
            None => ("-".to_string(), "-".to_string()),
            Some(Ok(intent)) => (
                intent
                    .component()
                    .map(|c| c.to_short_string())
                    .unwrap_or_else(|| "-".to_string()),
                intent.action().unwrap_or("-").to_string(),
            ),
            Some(Err(_)) => ("(unparseable)".to_string(), "-".to_string()),
        };
        println!(
            "  {:>6}  {:<40}  {:<30}",
            row.id,
            truncate(&component, 40),
            truncate(&action, 30)
        );
    }
    println!();
    println!("{} favorites", format_num(rows.len() as u64));

    Ok(())
}

fn inspect_record(store: &SqliteStore, row: &StoredRecord, as_json: bool) -> Result {
    let title = store.title(row.id)?;

    if as_json {
        let json = record_json(row, title.as_deref());
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Favorite: {}", row.id);
    println!("Title: {}", title.as_deref().unwrap_or("(none)"));
    let Some(uri) = row.intent.as_deref() else {
        println!("Intent: (none)");
        return Ok(());
    };
    println!("Intent: {uri}");

    match IntentDescriptor::parse(uri) {
        Ok(intent) => {
            println!("  Data: {}", non_empty(intent.data()));
            println!("  Action: {}", intent.action().unwrap_or("(none)"));
            for category in intent.categories() {
                println!("  Category: {category}");
            }
            match intent.component() {
                Some(c) => println!("  Component: {c}"),
                None => println!("  Component: (none)"),
            }
        }
        Err(e) => println!("  (unparseable: {e})"),
    }
    println!();

    Ok(())
}

/// `oti export --db <db>` — Export favorites as JSON.
pub fn export(db_path: &str) -> Result {
    let store = SqliteStore::open_read_only(db_path)?;
    let rows = store.query_all()?;

    let mut favorites = Vec::with_capacity(rows.len());
    for row in &rows {
        let title = store.title(row.id)?;
        favorites.push(record_json(row, title.as_deref()));
    }

    let output = json!({
        "database": db_path,
        "mapping_version": store.load_version()?,
        "favorites": favorites,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn record_json(row: &StoredRecord, title: Option<&str>) -> serde_json::Value {
    let parsed = match row.intent.as_deref().map(IntentDescriptor::parse) {
        None => serde_json::Value::Null,
        Some(Ok(intent)) => json!({
            "data": intent.data(),
            "action": intent.action(),
            "categories": intent.categories(),
            "component": intent.component().map(|c| c.to_string()),
        }),
        Some(Err(e)) => json!({ "error": e.to_string() }),
    };

    json!({
        "id": row.id,
        "title": title,
        "intent": row.intent,
        "parsed": parsed,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────

fn non_empty(s: &str) -> &str {
    if s.is_empty() {
        "(none)"
    } else {
        s
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_num(n: u64) -> String {
    if n < 1_000 {
        n.to_string()
    } else if n < 1_000_000 {
        format!("{},{:03}", n / 1_000, n % 1_000)
    } else {
        format!(
            "{},{:03},{:03}",
            n / 1_000_000,
            (n / 1_000) % 1_000,
            n % 1_000
        )
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
