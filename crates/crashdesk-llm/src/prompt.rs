//! Extraction prompt.
//!
//! The system prompt spells out the exact reply template the parser expects,
//! using the same header table, so the two cannot drift apart.

use crashdesk_triage::{strip_non_ascii, HeaderTable, VehicleField, NOT_SPECIFIED};

/// Vehicle blocks shown in the template. Replies may contain more.
pub const TEMPLATE_VEHICLES: u32 = 2;

const USER_PREFIX: &str = "Analyze this crash report and extract the requested information: \n\n";

fn placeholder(field: VehicleField) -> &'static str {
    match field {
        VehicleField::OwnerName => "[full name]",
        VehicleField::OwnerAddress => "[complete address]",
        VehicleField::Make => "[make]",
        VehicleField::Model => "[model]",
        VehicleField::Year => "[year]",
        VehicleField::Damage => "[damage details]",
        VehicleField::Injuries => "[injury status]",
        VehicleField::InsuranceCompany => "[insurance company name]",
        VehicleField::InsurancePolicyNumber => "[policy number]",
        VehicleField::TowingCompany => "[name of towing company]",
    }
}

/// System prompt describing the reply template.
pub fn system_prompt(headers: &HeaderTable) -> String {
    let mut prompt = String::from(
        "You are a specialized assistant analyzing automobile crash records.\n\
         Analyze the provided crash report and return ONLY the following information in this EXACT format:\n\n",
    );

    prompt.push_str(&headers.incident_summary);
    prompt.push_str("\n[2-3 sentence summary of the crash]\n\n");
    prompt.push_str(&headers.crash_date);
    prompt.push_str(" [MM/DD/YYYY format - date only, no time]\n\n");

    for number in 1..=TEMPLATE_VEHICLES {
        prompt.push_str(&format!("{} {}:\n", headers.vehicle_prefix, number));
        for field in VehicleField::ALL {
            prompt.push_str(&format!("{}: {}\n", field.label(), placeholder(field)));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Injuries must be one of: No apparent injury, Suspected minor injury, \
         Suspected serious injury, Fatal injury.\n\
         If any information is missing, write \"{}\".",
        NOT_SPECIFIED
    ));
    prompt
}

/// User message wrapping the report text. Non-ASCII characters become spaces.
pub fn user_message(report_text: &str) -> String {
    format!("{}{}", USER_PREFIX, strip_non_ascii(report_text))
}
