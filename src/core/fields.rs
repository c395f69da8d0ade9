//! Questionnaire steps shared by the MDO and HFO flows.
//!
//! Each step validates one answer, stores it under its placeholder key and
//! may derive extra placeholders (dates, sample numbers, randomised lab
//! values the form expects but the bunker delivery note does not carry).

use crate::core::messages;
use crate::domain::model::{FuelFamily, ReportData};
use crate::utils::validation::{
    is_report_number, parse_finite_number, parse_report_date, REPORT_DATE_FORMAT,
};
use chrono::Days;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Date,
    DateReceived,
    Location,
    Seal,
    Number,
    Barge,
    Dens,
    Visc,
    Flash,
    Pour,
    Carbon,
    Sulph,
}

/// Order in which answers are asked.
pub const QUESTIONNAIRE: [Field; 13] = [
    Field::Name,
    Field::Date,
    Field::DateReceived,
    Field::Location,
    Field::Seal,
    Field::Number,
    Field::Barge,
    Field::Dens,
    Field::Visc,
    Field::Flash,
    Field::Pour,
    Field::Carbon,
    Field::Sulph,
];

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "NAME",
            Field::Date => "DATE",
            Field::DateReceived => "DATE_RECEIVED",
            Field::Location => "LOCATION",
            Field::Seal => "SEAL",
            Field::Number => "NUMBER",
            Field::Barge => "BARGE",
            Field::Dens => "DENS",
            Field::Visc => "VISC",
            Field::Flash => "FLASH",
            Field::Pour => "POUR",
            Field::Carbon => "CARBON",
            Field::Sulph => "SULPH",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Field::Name => messages::ASK_NAME,
            Field::Date => messages::ASK_DATE,
            Field::DateReceived => messages::ASK_DATE_RECEIVED,
            Field::Location => messages::ASK_LOCATION,
            Field::Seal => messages::ASK_SEAL,
            Field::Number => messages::ASK_NUMBER,
            Field::Barge => messages::ASK_BARGE,
            Field::Dens => messages::ASK_DENS,
            Field::Visc => messages::ASK_VISC,
            Field::Flash => messages::ASK_FLASH,
            Field::Pour => messages::ASK_POUR,
            Field::Carbon => messages::ASK_CARBON,
            Field::Sulph => messages::ASK_SULPH,
        }
    }

    /// Stores a valid answer (plus derived values) into `data`.
    /// On rejection returns the message to send back; `data` is untouched.
    pub fn accept<R: Rng + ?Sized>(
        self,
        family: FuelFamily,
        raw: &str,
        data: &mut ReportData,
        rng: &mut R,
    ) -> Result<(), &'static str> {
        let answer = raw.trim();

        match self {
            Field::Date => {
                parse_report_date(answer).ok_or(messages::INVALID_DATE)?;
                data.insert(self.key(), answer.to_uppercase());
            }
            Field::DateReceived => {
                let tested = parse_report_date(answer)
                    .and_then(|received| received.checked_add_days(Days::new(1)))
                    .ok_or(messages::INVALID_DATE_RECEIVED)?;
                data.insert(self.key(), answer.to_uppercase());
                data.insert(
                    "DATE_TEST",
                    tested.format(REPORT_DATE_FORMAT).to_string().to_uppercase(),
                );
            }
            Field::Number => {
                if !is_report_number(answer) {
                    return Err(messages::INVALID_NUMBER);
                }
                data.insert(self.key(), answer);
                data.insert("SAMPLE", rng.gen_range(400_000..=900_000).to_string());
            }
            Field::Pour => {
                let pour = parse_finite_number(answer).ok_or(messages::INVALID_POUR)?;
                data.insert(self.key(), answer.to_uppercase());
                if family == FuelFamily::Mdo {
                    data.insert("CLOUD", format!("{:.1}", pour - 2.0));
                }
            }
            Field::Carbon => {
                data.insert(self.key(), answer.to_uppercase());
                if family == FuelFamily::Hfo {
                    data.insert("ASH", format!("{:.3}", rng.gen_range(0.001..=0.011)));
                }
            }
            Field::Sulph => {
                data.insert(self.key(), answer.to_uppercase());
                match family {
                    FuelFamily::Mdo => {
                        data.insert("ASH", format!("{:.3}", rng.gen_range(0.001..=0.011)));
                        data.insert("CETANE", format!("{:.1}", rng.gen_range(42.0..=62.0)));
                    }
                    FuelFamily::Hfo => {
                        data.insert("VANAD", rng.gen_range(220..=300).to_string());
                        data.insert("SEDIM", format!("{:.3}", rng.gen_range(0.040..=0.088)));
                    }
                }
            }
            Field::Name
            | Field::Location
            | Field::Seal
            | Field::Barge
            | Field::Dens
            | Field::Visc
            | Field::Flash => {
                data.insert(self.key(), answer.to_uppercase());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_free_text_is_trimmed_and_uppercased() {
        let mut data = ReportData::new();
        Field::Name
            .accept(FuelFamily::Mdo, "  Sea Breeze ", &mut data, &mut rng())
            .unwrap();
        assert_eq!(data.get("NAME"), Some("SEA BREEZE"));
    }

    #[test]
    fn test_date_received_derives_test_date() {
        let mut data = ReportData::new();
        Field::DateReceived
            .accept(FuelFamily::Hfo, "31-may-2025", &mut data, &mut rng())
            .unwrap();
        assert_eq!(data.get("DATE_RECEIVED"), Some("31-MAY-2025"));
        assert_eq!(data.get("DATE_TEST"), Some("01-JUN-2025"));
    }

    #[test]
    fn test_invalid_date_is_rejected_without_storing() {
        let mut data = ReportData::new();
        let err = Field::Date
            .accept(FuelFamily::Mdo, "2025-05-28", &mut data, &mut rng())
            .unwrap_err();
        assert_eq!(err, messages::INVALID_DATE);
        assert!(data.is_empty());
    }

    #[test]
    fn test_report_number_derives_sample() {
        let mut data = ReportData::new();
        Field::Number
            .accept(FuelFamily::Mdo, "280525", &mut data, &mut rng())
            .unwrap();
        let sample: u32 = data.get("SAMPLE").unwrap().parse().unwrap();
        assert!((400_000..=900_000).contains(&sample));

        let err = Field::Number
            .accept(FuelFamily::Mdo, "12345", &mut data, &mut rng())
            .unwrap_err();
        assert_eq!(err, messages::INVALID_NUMBER);
    }

    #[test]
    fn test_pour_derives_cloud_only_for_mdo() {
        let mut mdo = ReportData::new();
        Field::Pour
            .accept(FuelFamily::Mdo, "-6", &mut mdo, &mut rng())
            .unwrap();
        assert_eq!(mdo.get("POUR"), Some("-6"));
        assert_eq!(mdo.get("CLOUD"), Some("-8.0"));

        let mut hfo = ReportData::new();
        Field::Pour
            .accept(FuelFamily::Hfo, "10.5", &mut hfo, &mut rng())
            .unwrap();
        assert!(!hfo.contains_key("CLOUD"));

        assert_eq!(
            Field::Pour.accept(FuelFamily::Hfo, "ten", &mut hfo, &mut rng()),
            Err(messages::INVALID_POUR)
        );
    }

    #[test]
    fn test_final_step_derivations_per_family() {
        let mut mdo = ReportData::new();
        Field::Sulph
            .accept(FuelFamily::Mdo, "0.08", &mut mdo, &mut rng())
            .unwrap();
        let ash: f64 = mdo.get("ASH").unwrap().parse().unwrap();
        let cetane: f64 = mdo.get("CETANE").unwrap().parse().unwrap();
        assert!((0.001..=0.011).contains(&ash));
        assert!((42.0..=62.0).contains(&cetane));
        assert_eq!(mdo.get("ASH").unwrap().split('.').nth(1).unwrap().len(), 3);

        let mut hfo = ReportData::new();
        Field::Sulph
            .accept(FuelFamily::Hfo, "0.45", &mut hfo, &mut rng())
            .unwrap();
        let vanad: u32 = hfo.get("VANAD").unwrap().parse().unwrap();
        let sedim: f64 = hfo.get("SEDIM").unwrap().parse().unwrap();
        assert!((220..=300).contains(&vanad));
        assert!((0.040..=0.088).contains(&sedim));
        assert!(!hfo.contains_key("CETANE"));
    }

    #[test]
    fn test_hfo_carbon_derives_ash() {
        let mut data = ReportData::new();
        Field::Carbon
            .accept(FuelFamily::Hfo, "11.2", &mut data, &mut rng())
            .unwrap();
        assert!(data.contains_key("ASH"));

        let mut mdo = ReportData::new();
        Field::Carbon
            .accept(FuelFamily::Mdo, "0.1", &mut mdo, &mut rng())
            .unwrap();
        assert!(!mdo.contains_key("ASH"));
    }
}
