//! Per-chat questionnaire state machine.
//!
//! `Conversation` is transport-free: it turns one [`Input`] into a list of
//! [`Effect`]s and the dispatcher carries them out. Report generation is the
//! only effect whose result feeds back, via [`Conversation::report_finished`].

use crate::core::fields::{Field, QUESTIONNAIRE};
use crate::core::messages;
use crate::domain::model::{
    Effect, FuelKind, HfoGrade, Input, Keyboard, ReportData, BUTTON_ANOTHER_PDF, BUTTON_FINISH,
    BUTTON_HFO, BUTTON_MDO,
};
use rand::Rng;

pub const COMMAND_START: &str = "start";
pub const COMMAND_CANCEL: &str = "cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ChooseFuel,
    ChooseHfoGrade,
    Collecting { kind: FuelKind, step: usize },
    Generating,
    AskAgain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered,
    /// The PDF was produced but could not be sent.
    DeliveryFailed,
    GenerationFailed,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    state: State,
    data: ReportData,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            data: ReportData::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn data(&self) -> &ReportData {
        &self.data
    }

    pub fn is_active(&self) -> bool {
        self.state != State::Idle
    }

    /// Drops an unfinished questionnaire once the chat has gone quiet.
    pub fn expire(&mut self) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        self.reset();
        vec![Effect::reply_with(messages::SESSION_EXPIRED, Keyboard::Start)]
    }

    pub fn handle<R: Rng + ?Sized>(&mut self, input: &Input, rng: &mut R) -> Vec<Effect> {
        match input {
            // Only opens a conversation; `/cancel` is the way out of a running one.
            Input::Command(name) if name == COMMAND_START && !self.is_active() => self.restart(),
            Input::Command(name) if name == COMMAND_CANCEL && self.is_active() => {
                self.reset();
                vec![Effect::reply(messages::CANCELLED)]
            }
            // Other commands and non-text updates never advance the flow.
            Input::Command(_) | Input::Other => Vec::new(),
            Input::Text(text) => self.handle_text(text, rng),
        }
    }

    pub fn report_finished(&mut self, outcome: ReportOutcome) -> Vec<Effect> {
        if self.state != State::Generating {
            tracing::warn!(state = ?self.state, "report outcome arrived outside generation");
            return Vec::new();
        }

        match outcome {
            ReportOutcome::GenerationFailed => {
                self.reset();
                vec![Effect::reply(messages::GENERATION_FAILED)]
            }
            ReportOutcome::Delivered | ReportOutcome::DeliveryFailed => {
                self.state = State::AskAgain;
                let mut effects = Vec::with_capacity(2);
                if outcome == ReportOutcome::DeliveryFailed {
                    effects.push(Effect::reply(messages::DELIVERY_FAILED));
                }
                effects.push(Effect::reply_with(messages::WHAT_NEXT, Keyboard::Again));
                effects
            }
        }
    }

    fn handle_text<R: Rng + ?Sized>(&mut self, text: &str, rng: &mut R) -> Vec<Effect> {
        match self.state {
            State::Idle | State::Generating => Vec::new(),
            State::ChooseFuel => self.choose_fuel(text),
            State::ChooseHfoGrade => self.choose_hfo_grade(text),
            State::Collecting { kind, step } => self.collect(kind, step, text, rng),
            State::AskAgain => self.ask_again(text),
        }
    }

    fn restart(&mut self) -> Vec<Effect> {
        self.data.clear();
        self.state = State::ChooseFuel;
        vec![Effect::reply_with(messages::CHOOSE_FUEL, Keyboard::Fuel)]
    }

    fn reset(&mut self) {
        self.data.clear();
        self.state = State::Idle;
    }

    fn choose_fuel(&mut self, text: &str) -> Vec<Effect> {
        match text.trim() {
            BUTTON_MDO => {
                self.data.clear();
                self.begin_questionnaire(FuelKind::Mdo)
            }
            BUTTON_HFO => {
                self.data.clear();
                self.state = State::ChooseHfoGrade;
                vec![Effect::reply_with(messages::CHOOSE_HFO_GRADE, Keyboard::HfoGrade)]
            }
            _ => vec![Effect::reply_with(messages::CHOOSE_FUEL_AGAIN, Keyboard::Fuel)],
        }
    }

    fn choose_hfo_grade(&mut self, text: &str) -> Vec<Effect> {
        match HfoGrade::from_label(text) {
            Some(grade) => self.begin_questionnaire(FuelKind::Hfo(grade)),
            None => vec![Effect::reply_with(
                messages::INVALID_HFO_GRADE,
                Keyboard::HfoGrade,
            )],
        }
    }

    fn begin_questionnaire(&mut self, kind: FuelKind) -> Vec<Effect> {
        self.data.insert("FUEL", kind.fuel_label());
        self.state = State::Collecting { kind, step: 0 };
        vec![Effect::reply(QUESTIONNAIRE[0].prompt())]
    }

    fn collect<R: Rng + ?Sized>(
        &mut self,
        kind: FuelKind,
        step: usize,
        text: &str,
        rng: &mut R,
    ) -> Vec<Effect> {
        let Some(field) = QUESTIONNAIRE.get(step).copied() else {
            tracing::error!(step, "questionnaire step out of range, resetting");
            self.reset();
            return vec![Effect::reply(messages::GENERATION_FAILED)];
        };

        if let Err(rejection) = field.accept(kind.family(), text, &mut self.data, rng) {
            return vec![Effect::reply(rejection)];
        }

        match QUESTIONNAIRE.get(step + 1).copied() {
            Some(next) => {
                self.state = State::Collecting {
                    kind,
                    step: step + 1,
                };
                vec![Effect::reply(next.prompt())]
            }
            None => {
                debug_assert_eq!(field, Field::Sulph);
                self.state = State::Generating;
                vec![
                    Effect::reply(messages::generating(kind.family())),
                    Effect::Generate {
                        kind,
                        data: self.data.clone(),
                    },
                ]
            }
        }
    }

    fn ask_again(&mut self, text: &str) -> Vec<Effect> {
        match text.trim() {
            BUTTON_ANOTHER_PDF => self.restart(),
            BUTTON_FINISH => {
                self.reset();
                vec![Effect::reply_with(messages::FINISHED, Keyboard::Start)]
            }
            _ => vec![Effect::reply_with(messages::PRESS_A_BUTTON, Keyboard::Again)],
        }
    }
}
