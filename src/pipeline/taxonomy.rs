//! Maritime document taxonomy: categories, sub-categories, and the per-type
//! extraction hints appended to OCR prompts.
//!
//! The registry is built once per process and is read-only afterwards. All
//! lookups are pure; unknown names yield an empty hint or `false`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::enums::{PrimaryCategory, SecondaryCategory};

use PrimaryCategory::*;
use SecondaryCategory::*;

/// One specific document type known to the registry.
#[derive(Debug)]
pub struct DocumentTypeEntry {
    pub name: &'static str,
    pub primary: PrimaryCategory,
    pub secondary: Option<SecondaryCategory>,
    /// Free-text instruction appended to the extraction prompt.
    pub hint: &'static str,
}

macro_rules! doc_type {
    ($name:literal, $primary:expr, $secondary:expr, $hint:literal) => {
        DocumentTypeEntry {
            name: $name,
            primary: $primary,
            secondary: $secondary,
            hint: $hint,
        }
    };
}

static DOCUMENT_TYPES: &[DocumentTypeEntry] = &[
    // ── Vessel certificates: safety ──
    doc_type!("Safety Management Certificate", VesselCertificate, Some(SafetyCertificate),
        "Issued under the ISM Code. Capture the company name and IMO company number, the ship type, \
         the certificate number, the issuing Administration or Recognized Organization, and every \
         intermediate verification with its date."),
    doc_type!("Document of Compliance", VesselCertificate, Some(SafetyCertificate),
        "ISM Document of Compliance issued to the company. Capture the company name and address, \
         the ship types covered, the annual verification endorsements and their dates."),
    doc_type!("International Ship Security Certificate", VesselCertificate, Some(SafetyCertificate),
        "Issued under the ISPS Code. Capture the ship security certificate number, the port of \
         registry, the intermediate verification date, and whether it is full-term or interim."),
    doc_type!("Cargo Ship Safety Construction Certificate", VesselCertificate, Some(SafetyCertificate),
        "SOLAS construction certificate. Capture the keel-laying date, the date of build, the annual \
         and intermediate survey endorsements, and any exemption certificate references."),
    doc_type!("Cargo Ship Safety Equipment Certificate", VesselCertificate, Some(SafetyCertificate),
        "SOLAS equipment certificate. Extract the Record of Equipment (Form E) table when present: \
         lifeboats, liferafts, rescue boats, lifebuoys, and the total persons accommodated."),
    doc_type!("Cargo Ship Safety Radio Certificate", VesselCertificate, Some(SafetyCertificate),
        "SOLAS radio certificate. Capture the GMDSS sea areas, the call sign, the MMSI, and the \
         Record of Equipment (Form R) entries."),
    doc_type!("Passenger Ship Safety Certificate", VesselCertificate, Some(SafetyCertificate),
        "Capture the maximum number of passengers, the trading area, the lifesaving appliance totals, \
         and the survey endorsement dates."),
    doc_type!("Minimum Safe Manning Document", VesselCertificate, Some(SafetyCertificate),
        "Extract the manning table as key-value pairs, one rank per key with the number of persons \
         and the STCW regulation required, plus any operating-area limitations."),
    doc_type!("Maritime Labour Certificate", VesselCertificate, Some(SafetyCertificate),
        "MLC 2006 certificate. Capture the DMLC Part I and Part II references, the shipowner name, \
         and the intermediate inspection date."),
    // ── Vessel certificates: pollution prevention ──
    doc_type!("International Oil Pollution Prevention Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "MARPOL Annex I certificate. Capture the ship type, the Supplement (Form A or Form B), the \
         oily water separator and oil content meter particulars, and the annual survey endorsements."),
    doc_type!("International Air Pollution Prevention Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "MARPOL Annex VI certificate. Capture the engine EIAPP references, the fuel sulphur compliance \
         method, any exhaust gas cleaning system, and the survey endorsements."),
    doc_type!("International Sewage Pollution Prevention Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "MARPOL Annex IV certificate. Capture the sewage treatment plant type and the number of \
         persons the ship is certified to carry."),
    doc_type!("International Anti-Fouling System Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "AFS Convention certificate. Capture the anti-fouling system type, the manufacturer, the \
         product name, and the date of application."),
    doc_type!("Ballast Water Management Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "BWM Convention certificate. Capture the ballast water management method, the treatment \
         system type approval reference, and the ballast capacity."),
    doc_type!("International Energy Efficiency Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "Capture the attained EEDI or EEXI value, the required value, and the SEEMP reference."),
    doc_type!("Bunker Convention Certificate", VesselCertificate,
        Some(PollutionPreventionCertificate),
        "Certificate of insurance for bunker oil pollution damage. Capture the insurer, the policy \
         period, and the limit of liability."),
    // ── Vessel certificates: load line & tonnage ──
    doc_type!("International Load Line Certificate", VesselCertificate,
        Some(LoadLineTonnageCertificate),
        "Capture the freeboard table (tropical, summer, winter, winter North Atlantic, timber, fresh \
         water allowance) as key-value pairs, the deck line position, and the annual survey dates."),
    doc_type!("International Tonnage Certificate", VesselCertificate,
        Some(LoadLineTonnageCertificate),
        "ITC 69 certificate. Capture the gross tonnage, the net tonnage, the principal dimensions, \
         and the date of the original tonnage measurement."),
    doc_type!("Suez Canal Tonnage Certificate", VesselCertificate,
        Some(LoadLineTonnageCertificate),
        "Capture the Suez Canal gross and net tonnage and the issuing classification society."),
    // ── Vessel certificates: classification ──
    doc_type!("Certificate of Class", VesselCertificate, Some(ClassificationCertificate),
        "Capture the classification society, the class notation in full, the register number, and \
         any conditions of class or memoranda listed."),
    doc_type!("Hull Certificate", VesselCertificate, Some(ClassificationCertificate),
        "Capture the hull class notation, the survey date, the surveyor, and the next special survey \
         due date."),
    doc_type!("Machinery Certificate", VesselCertificate, Some(ClassificationCertificate),
        "Capture the machinery class notation, the main engine make and output, and the survey \
         dates."),
    // ── Vessel certificates: registration ──
    doc_type!("Certificate of Registry", VesselCertificate, Some(RegistrationCertificate),
        "Capture the flag state, the port of registry, the official number, the call sign, the \
         registered owner, and the provisional or permanent status."),
    doc_type!("Continuous Synopsis Record", VesselCertificate, Some(RegistrationCertificate),
        "Extract every numbered CSR entry in order: flag, date of registration, ship name, port of \
         registry, registered owner, bareboat charterer, company, and classification society."),
    doc_type!("Ship Radio Station Licence", VesselCertificate, Some(RegistrationCertificate),
        "Capture the call sign, the MMSI, the licensee, and the authorised radio equipment list."),
    // ── Crew documents ──
    doc_type!("Certificate of Competency", CrewDocument, None,
        "Capture the holder's full name, date of birth, the STCW regulation, the capacity, the \
         limitations, and the functions and levels table."),
    doc_type!("Certificate of Proficiency", CrewDocument, None,
        "Capture the holder's name, the course or proficiency title, the STCW regulation, the \
         training centre, and the certificate number."),
    doc_type!("Seafarer Medical Certificate", CrewDocument, None,
        "Capture the seafarer's name, the examining practitioner, fitness for lookout duties, any \
         limitations, and the colour vision result."),
    doc_type!("Seaman's Book", CrewDocument, None,
        "Capture the holder's name, nationality, book number, and every sea-service entry with the \
         vessel, rank, sign-on and sign-off dates."),
    doc_type!("Passport", CrewDocument, None,
        "Capture the surname, given names, nationality, passport number, date of birth, and the \
         machine-readable zone lines verbatim."),
    doc_type!("STCW Endorsement", CrewDocument, None,
        "Capture the endorsing Administration, the certificate endorsed, the capacity, and the \
         limitations."),
    doc_type!("Crew List", CrewDocument, None,
        "Preserve the crew table: one row per seafarer with rank, name, nationality, and document \
         numbers, in the original order."),
    doc_type!("Seafarer Employment Agreement", CrewDocument, None,
        "Capture the seafarer's name, the shipowner, the position, the wage terms, the contract \
         duration, and the place of signature."),
    // ── Survey & inspection reports ──
    doc_type!("Port State Control Inspection Report", SurveyReport, None,
        "Capture the port, the MOU, the inspection type, the number of deficiencies, each \
         deficiency code with its action taken, and whether the ship was detained."),
    doc_type!("Flag State Inspection Report", SurveyReport, None,
        "Capture the inspecting Administration, the inspector, the findings, and the rectification \
         deadlines."),
    doc_type!("Class Survey Report", SurveyReport, None,
        "Capture the survey type, the items surveyed, any recommendations or conditions of class, \
         and the due dates."),
    doc_type!("Vetting Inspection Report", SurveyReport, None,
        "SIRE or CDI style report. Capture the inspecting company, the chapter-by-chapter \
         observations, and the total number of observations."),
    doc_type!("Condition Survey Report", SurveyReport, None,
        "Capture the surveyor, the scope of survey, the overall condition rating, and the findings."),
    doc_type!("Dry Dock Report", SurveyReport, None,
        "Capture the shipyard, the docking and undocking dates, the work items, and the hull \
         coating specification."),
    // ── Commercial documents ──
    doc_type!("Bill of Lading", CommercialDocument, None,
        "Capture the shipper, consignee, notify party, port of loading, port of discharge, cargo \
         description, quantity, and the number of originals."),
    doc_type!("Charter Party", CommercialDocument, None,
        "Capture the charter form, the owners, the charterers, the laycan, the freight or hire rate, \
         and the clause numbers referenced."),
    doc_type!("Cargo Manifest", CommercialDocument, None,
        "Preserve the cargo table: bill of lading numbers, marks, packages, description, and weight."),
    doc_type!("Invoice", CommercialDocument, None,
        "Capture the invoice number, the supplier, the buyer, the line items table, the currency, \
         and the total amount."),
    doc_type!("P&I Certificate of Entry", CommercialDocument, None,
        "Capture the P&I club, the member, the policy year, the risks covered, and the limits."),
    doc_type!("Hull and Machinery Insurance Policy", CommercialDocument, None,
        "Capture the insurers, the assured, the insured value, the deductible, and the policy period."),
    // ── Operational records ──
    doc_type!("Oil Record Book", OperationalRecord, None,
        "Preserve every entry in order with its date, code letter, item number, and the signature \
         of the officer in charge."),
    doc_type!("Garbage Record Book", OperationalRecord, None,
        "Preserve each discharge entry: date, time, position, garbage category, and estimated amount."),
    doc_type!("Deck Log Book", OperationalRecord, None,
        "Preserve the hourly log table: time, course, speed, position, weather, and remarks."),
    doc_type!("Bunker Delivery Note", OperationalRecord, None,
        "Capture the supplier, the port, the product grade, the quantity delivered, the density, the \
         sulphur content, and the delivery date."),
    doc_type!("Noon Report", OperationalRecord, None,
        "Capture the noon position, the distance run, the average speed, the fuel consumption, and \
         the remaining on board figures."),
    // ── Correspondence ──
    doc_type!("Letter", Correspondence, None,
        "Capture the sender, the recipient, the reference number, and the subject line."),
    doc_type!("Flag State Circular", Correspondence, None,
        "Capture the circular number, the issuing Administration, the subject, and the effective date."),
    doc_type!("Memorandum", Correspondence, None,
        "Capture the author, the addressees, the subject, and any action items."),
];

/// Read-only registry over [`DOCUMENT_TYPES`].
pub struct Taxonomy {
    by_name: HashMap<String, &'static DocumentTypeEntry>,
}

static TAXONOMY: LazyLock<Taxonomy> = LazyLock::new(|| {
    let by_name = DOCUMENT_TYPES
        .iter()
        .map(|entry| (normalize_key(entry.name), entry))
        .collect();
    tracing::debug!(document_types = DOCUMENT_TYPES.len(), "Taxonomy registry loaded");
    Taxonomy { by_name }
});

/// The process-wide taxonomy.
pub fn taxonomy() -> &'static Taxonomy {
    &TAXONOMY
}

fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Taxonomy {
    /// Every specific document type, in registry order.
    pub fn entries(&self) -> &'static [DocumentTypeEntry] {
        DOCUMENT_TYPES
    }

    pub fn get(&self, document_type: &str) -> Option<&'static DocumentTypeEntry> {
        self.by_name.get(&normalize_key(document_type)).copied()
    }

    /// Extraction hint for a document type, or `""` when the type is unknown.
    pub fn lookup_extraction_hint(&self, document_type: &str) -> &'static str {
        self.get(document_type).map(|e| e.hint).unwrap_or("")
    }

    /// True for the six taxonomy categories; `Uncertain` is not a taxonomy member.
    pub fn is_known_primary_category(&self, name: &str) -> bool {
        PrimaryCategory::from_str(name)
            .map(|c| c != PrimaryCategory::Uncertain)
            .unwrap_or(false)
    }

    pub fn is_valid_secondary(&self, primary: &str, secondary: &str) -> bool {
        match (
            PrimaryCategory::from_str(primary),
            SecondaryCategory::from_str(secondary),
        ) {
            (Ok(p), Ok(_)) => p.accepts_secondary(),
            _ => false,
        }
    }

    /// Categories the registry files a specific document type under.
    pub fn category_for(
        &self,
        document_type: &str,
    ) -> Option<(PrimaryCategory, Option<SecondaryCategory>)> {
        self.get(document_type).map(|e| (e.primary, e.secondary))
    }

    pub fn document_types_under(
        &self,
        primary: PrimaryCategory,
        secondary: Option<SecondaryCategory>,
    ) -> impl Iterator<Item = &'static DocumentTypeEntry> {
        DOCUMENT_TYPES
            .iter()
            .filter(move |e| e.primary == primary && e.secondary == secondary)
    }
}

/// Shorthand for `taxonomy().lookup_extraction_hint(..)`.
pub fn lookup_extraction_hint(document_type: &str) -> &'static str {
    taxonomy().lookup_extraction_hint(document_type)
}

pub fn is_known_primary_category(name: &str) -> bool {
    taxonomy().is_known_primary_category(name)
}

pub fn is_valid_secondary(primary: &str, secondary: &str) -> bool {
    taxonomy().is_valid_secondary(primary, secondary)
}
