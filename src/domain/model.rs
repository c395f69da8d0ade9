use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const MDO_FUEL_LABEL: &str = "LSMGO DMA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HfoGrade {
    Rmg180,
    Rmg380,
}

impl HfoGrade {
    pub const ALL: [HfoGrade; 2] = [HfoGrade::Rmg180, HfoGrade::Rmg380];

    pub fn label(self) -> &'static str {
        match self {
            HfoGrade::Rmg180 => "LSFO RMG-180",
            HfoGrade::Rmg380 => "LSFO RMG-380",
        }
    }

    /// Case-insensitive match against the keyboard labels.
    pub fn from_label(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_uppercase();
        Self::ALL.into_iter().find(|grade| grade.label() == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelKind {
    Mdo,
    Hfo(HfoGrade),
}

impl FuelKind {
    /// Value stored under the `FUEL` placeholder.
    pub fn fuel_label(self) -> &'static str {
        match self {
            FuelKind::Mdo => MDO_FUEL_LABEL,
            FuelKind::Hfo(grade) => grade.label(),
        }
    }

    pub fn family(self) -> FuelFamily {
        match self {
            FuelKind::Mdo => FuelFamily::Mdo,
            FuelKind::Hfo(_) => FuelFamily::Hfo,
        }
    }
}

/// Which template and questionnaire variant a report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelFamily {
    Mdo,
    Hfo,
}

impl fmt::Display for FuelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelFamily::Mdo => f.write_str("MDO"),
            FuelFamily::Hfo => f.write_str("HFO"),
        }
    }
}

/// Placeholder values collected during a conversation, keyed by uppercase
/// placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    values: BTreeMap<String, String>,
}

impl ReportData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_uppercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ReportData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = ReportData::new();
        for (key, value) in iter {
            data.insert(key.as_ref(), value);
        }
        data
    }
}

/// Reply keyboards shown under a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    None,
    Fuel,
    HfoGrade,
    Again,
    Start,
}

pub const BUTTON_HFO: &str = "HFO";
pub const BUTTON_MDO: &str = "MDO";
pub const BUTTON_ANOTHER_PDF: &str = "Сделать ещё один PDF";
pub const BUTTON_FINISH: &str = "Завершить работу";
pub const BUTTON_START: &str = "/start";

impl Keyboard {
    pub fn rows(self) -> Vec<Vec<&'static str>> {
        match self {
            Keyboard::None => Vec::new(),
            Keyboard::Fuel => vec![vec![BUTTON_HFO, BUTTON_MDO]],
            Keyboard::HfoGrade => vec![HfoGrade::ALL.iter().map(|g| g.label()).collect()],
            Keyboard::Again => vec![vec![BUTTON_ANOTHER_PDF, BUTTON_FINISH]],
            Keyboard::Start => vec![vec![BUTTON_START]],
        }
    }
}

/// Something the conversation asks the outside world to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Reply { text: String, keyboard: Keyboard },
    Generate { kind: FuelKind, data: ReportData },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Keyboard::None,
        }
    }

    pub fn reply_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard,
        }
    }
}

/// Incoming chat input after transport decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(String),
    Text(String),
    /// Stickers, photos and anything else without text.
    Other,
}

impl Input {
    /// Splits `/cmd@botname args` into the bare lowercase command name.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.strip_prefix('/') {
            Some(rest) => {
                let word = rest.split_whitespace().next().unwrap_or("");
                let name = word.split('@').next().unwrap_or("");
                Input::Command(name.to_lowercase())
            }
            None => Input::Text(text.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub file_name: String,
    pub pdf: Vec<u8>,
}
