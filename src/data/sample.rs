//! Synthetic sales file generation (for trying the tool without real data).
//!
//! Output is a semicolon CSV in the chosen schema/decimal convention, so it
//! goes straight back through the loader.

use chrono::{Days, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DecimalSeparator, Field};
use crate::error::AppError;
use crate::io::schema::SchemaMapping;

/// `(product type, product line, list price, unit cost ratio)`.
const CATALOG: [(&str, &str, f64, f64); 10] = [
    ("Cooking Gear", "Camping Equipment", 85.0, 0.55),
    ("Tents", "Camping Equipment", 320.0, 0.60),
    ("Sleeping Bags", "Camping Equipment", 140.0, 0.52),
    ("Lanterns", "Camping Equipment", 28.0, 0.45),
    ("Climbing Accessories", "Mountaineering Equipment", 48.0, 0.50),
    ("Rope", "Mountaineering Equipment", 110.0, 0.58),
    ("Eyewear", "Personal Accessories", 95.0, 0.40),
    ("Watches", "Personal Accessories", 210.0, 0.48),
    ("First Aid", "Outdoor Protection", 18.0, 0.35),
    ("Insect Repellents", "Outdoor Protection", 9.0, 0.30),
];

const COUNTRIES: [&str; 8] = ["Argentina", "Mexico", "Chile", "Spain", "United States", "Brazil", "Colombia", "Peru"];

const ORDERING_METHODS: [&str; 7] = ["Web", "Sales visit", "Telephone", "E-mail", "Fax", "Mail", "Special"];

/// Settings for `sales demo`.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub rows: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub days: u64,
    pub schema: SchemaMapping,
    pub decimal: DecimalSeparator,
    /// Probability of a clearance sale (priced below cost).
    pub clearance_prob: f64,
}

/// Generate a demo CSV file body.
pub fn generate_demo_csv(config: &DemoConfig) -> Result<Vec<u8>, AppError> {
    if config.rows == 0 {
        return Err(AppError::new(2, "Row count must be > 0."));
    }
    if config.days == 0 {
        return Err(AppError::new(2, "Day span must be > 0."));
    }
    if !(0.0..1.0).contains(&config.clearance_prob) {
        return Err(AppError::new(2, "Invalid clearance probability."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let price_noise = Normal::new(0.0_f64, 0.08)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    let headers: Vec<&str> = Field::ALL.iter().map(|&f| config.schema.column(f)).collect();
    writer
        .write_record(&headers)
        .map_err(|e| AppError::new(4, format!("Failed to write demo header: {e}")))?;

    for _ in 0..config.rows {
        let offset = rng.gen_range(0..config.days);
        let date = config
            .start
            .checked_add_days(Days::new(offset))
            .unwrap_or(config.start);

        let (product_type, product_line, list_price, cost_ratio) = CATALOG[rng.gen_range(0..CATALOG.len())];
        let country = COUNTRIES[rng.gen_range(0..COUNTRIES.len())];
        let method = ORDERING_METHODS[rng.gen_range(0..ORDERING_METHODS.len())];
        let quantity: u64 = rng.gen_range(1..=250);

        let unit_cost = round2(list_price * cost_ratio);
        let mut price = list_price * (1.0 + price_noise.sample(&mut rng)).max(0.5);
        if rng.r#gen::<f64>() < config.clearance_prob {
            price = unit_cost * rng.gen_range(0.6..0.95);
        }
        let price = round2(price);

        writer
            .write_record([
                date.format("%d/%m/%Y").to_string(),
                product_type.to_string(),
                product_line.to_string(),
                quantity.to_string(),
                fmt_amount(price, config.decimal),
                fmt_amount(unit_cost, config.decimal),
                method.to_string(),
                country.to_string(),
            ])
            .map_err(|e| AppError::new(4, format!("Failed to write demo row: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::new(4, format!("Failed to finish demo CSV: {e}")))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn fmt_amount(v: f64, decimal: DecimalSeparator) -> String {
    let text = format!("{v:.2}");
    match decimal {
        DecimalSeparator::Dot => text,
        DecimalSeparator::Comma => text.replace('.', ","),
    }
}
