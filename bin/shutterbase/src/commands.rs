use std::collections::BTreeMap;

use sb_core::id;
use sb_services::GalleryService;

use crate::cli::Command;

pub async fn run_command(service: &GalleryService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Migrate { day } => migrate(service, day).await,
        Command::Verify => verify(service).await,
        Command::Stats => stats(service).await,
    }
}

async fn migrate(service: &GalleryService, day: u8) -> anyhow::Result<()> {
    let migrated = service.migrate_day(day).await?;
    println!("migrated {} record(s) for day {day}", migrated.len());
    for record in &migrated {
        if let (Some(id), Some(original)) = (record.id, record.original_id) {
            println!("  {original} -> {} ({})", id, id::format_id(id));
        }
    }
    Ok(())
}

async fn verify(service: &GalleryService) -> anyhow::Result<()> {
    let records = service.catalog().await?;
    let mut problems = 0usize;

    for record in &records {
        match record.id {
            None => {
                problems += 1;
                println!("missing id: {} ({})", record.storage_path, record.upload_date);
            }
            Some(id) if !id::is_well_formed(id) => {
                problems += 1;
                println!("legacy id {} -> {}", id, id::format_id(id));
            }
            Some(_) => {}
        }
    }

    let orphans = service.orphan_blobs().await?;
    for path in &orphans {
        println!("orphan blob: {path}");
    }

    if problems == 0 && orphans.is_empty() {
        println!("catalog clean: {} record(s)", records.len());
    } else {
        println!(
            "{problems} malformed record(s), {} orphan blob(s)",
            orphans.len()
        );
    }
    Ok(())
}

async fn stats(service: &GalleryService) -> anyhow::Result<()> {
    let records = service.catalog().await?;
    let mut per_day: BTreeMap<u8, usize> = BTreeMap::new();
    for record in &records {
        *per_day.entry(record.day).or_default() += 1;
    }

    println!("{} record(s) total", records.len());
    for (day, count) in per_day {
        println!("  day {day}: {count}");
    }
    for highlight in service.highlights().await? {
        let label = highlight
            .id
            .map(id::format_id)
            .unwrap_or_else(|| "<no id>".into());
        println!("  highlight of day {}: {label}", highlight.day);
    }
    Ok(())
}
