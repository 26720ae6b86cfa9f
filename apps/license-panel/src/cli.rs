use anyhow::Result;
use license_db::License;

use crate::services::license_service::LicenseService;

fn print_row(license: &License) {
    println!(
        "{:>5}  {}  {:<7}  {:<20}  {:<20}  {}",
        license.id,
        license.key,
        if license.active { "active" } else { "blocked" },
        license.expires_display(),
        license.owner_display(),
        license.notes_display(),
    );
}

pub async fn list_licenses(service: &LicenseService) -> Result<()> {
    let licenses = service.list().await?;
    if licenses.is_empty() {
        println!("No licenses.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<24}  {:<7}  {:<20}  {:<20}  {}",
        "ID", "KEY", "STATUS", "EXPIRES", "OWNER", "NOTES"
    );
    for license in &licenses {
        print_row(license);
    }
    Ok(())
}

pub async fn create_license(
    service: &LicenseService,
    owner: Option<&str>,
    days: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let days = match days {
        Some(raw) => LicenseService::parse_days(raw)?,
        None => None,
    };
    let license = service.create(owner, days, notes).await?;

    println!("License created: {}", license.key);
    println!("Expires: {}", license.expires_display());
    Ok(())
}

pub async fn toggle_license(service: &LicenseService, id: i64) -> Result<()> {
    let license = service.toggle_active(id).await?;
    println!(
        "License #{} is now {}.",
        license.id,
        if license.active { "active" } else { "blocked" }
    );
    Ok(())
}

pub async fn delete_license(service: &LicenseService, id: i64) -> Result<()> {
    service.delete(id).await?;
    println!("License #{} deleted.", id);
    Ok(())
}

pub async fn check_license(service: &LicenseService, key: &str) -> Result<()> {
    let verdict = service.validate(Some(key)).await?;
    println!("{}", verdict.code());
    if let Some(license) = verdict.license() {
        print_row(license);
    }
    Ok(())
}
