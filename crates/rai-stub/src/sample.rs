//! Built-in catalog served when no decision-tree directory is configured.

use rai_catalog::{CatalogItem, CatalogSection, StandardsCatalog};

const SAMPLE: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "IAS 1",
        "Presentation of Financial Statements",
        &[
            ("1.10", "Does the entity present a statement of financial position as at the end of the period?"),
            ("1.10", "Does the entity present a statement of profit or loss and other comprehensive income for the period?"),
            ("1.25", "Has management assessed the entity's ability to continue as a going concern?"),
            ("1.38", "Does the entity present comparative information for the preceding period?"),
            ("1.117", "Does the entity disclose its significant accounting policies?"),
        ],
    ),
    (
        "IAS 2",
        "Inventories",
        &[
            ("2.36(a)", "Does the entity disclose the accounting policies adopted in measuring inventories?"),
            ("2.36(b)", "Does the entity disclose the total carrying amount of inventories?"),
            ("2.36(d)", "Does the entity disclose the amount of inventories recognised as an expense?"),
            ("2.36(e)", "Does the entity disclose any write-down of inventories recognised as an expense?"),
        ],
    ),
    (
        "IAS 7",
        "Statement of Cash Flows",
        &[
            ("7.10", "Does the statement of cash flows classify flows by operating, investing and financing activities?"),
            ("7.45", "Does the entity reconcile cash and cash equivalents to the statement of financial position?"),
            ("7.44A", "Does the entity disclose changes in liabilities arising from financing activities?"),
        ],
    ),
    (
        "IAS 16",
        "Property, Plant and Equipment",
        &[
            ("16.73(a)", "Does the entity disclose the measurement bases used for property, plant and equipment?"),
            ("16.73(d)", "Does the entity disclose the gross carrying amount and accumulated depreciation?"),
            ("16.73(e)", "Does the entity present a reconciliation of carrying amounts at the beginning and end of the period?"),
        ],
    ),
    (
        "IFRS 15",
        "Revenue from Contracts with Customers",
        &[
            ("15.113", "Does the entity disclose revenue recognised from contracts with customers?"),
            ("15.114", "Does the entity disaggregate revenue into categories?"),
            ("15.119", "Does the entity describe its performance obligations?"),
        ],
    ),
];

/// The built-in sample catalog.
pub fn sample_catalog() -> StandardsCatalog {
    StandardsCatalog::from_sections(SAMPLE.iter().map(|(section, title, items)| {
        let key = section.replace(' ', "_");
        CatalogSection {
            section: section.to_string(),
            title: title.to_string(),
            description: String::new(),
            items: items
                .iter()
                .enumerate()
                .map(|(i, (reference, question))| CatalogItem {
                    id: format!("{key}_q{}", i + 1),
                    question: question.to_string(),
                    reference: reference.to_string(),
                    original_question: None,
                })
                .collect(),
            file_name: "built-in".to_string(),
        }
    }))
}
