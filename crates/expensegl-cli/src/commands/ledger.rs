//! Ledger command implementations

use anyhow::Result;
use expensegl_core::{MatchType, ReferenceData};

pub fn cmd_codes(reference: &ReferenceData, department: &str, activity: &str) -> Result<()> {
    let department = department.trim();
    let activity = activity.trim();
    if department.is_empty() || activity.is_empty() {
        anyhow::bail!("Both --department and --activity are required");
    }

    let matches = reference.account_codes(department, activity);
    let name = reference.department_name_for_code(department);

    if name.is_empty() {
        println!("📒 Department {department}, activity {activity}");
    } else {
        println!("📒 Department {department} ({name}), activity {activity}");
    }

    if matches.is_empty() {
        println!("   No account codes found.");
        return Ok(());
    }

    for code in &matches {
        println!("   {:<8} {}", code.account_code, code.description);
    }
    println!();
    println!("   {} account code(s)", matches.len());

    Ok(())
}

pub fn cmd_department(reference: &ReferenceData, name: &str, email: Option<&str>) -> Result<()> {
    let result = match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => reference.resolve_department_for_email(email, name),
        None => reference.resolve_department(name),
    };

    match result.match_type {
        MatchType::None => {
            println!("❓ No department matched \"{}\"", name.trim());
        }
        match_type => {
            println!(
                "🏢 {} - {} ({})",
                result.department_code, result.department_name, match_type
            );
            if result.override_used {
                println!("   Email override applied");
            }
        }
    }

    if !result.candidates.is_empty() {
        println!();
        println!("   Candidates:");
        for candidate in &result.candidates {
            println!(
                "   {:<6} {}",
                candidate.department_code, candidate.department_name
            );
        }
    }

    Ok(())
}
