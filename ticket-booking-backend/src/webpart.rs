//! The booking form as the host page mounts it.

use std::sync::Arc;

use serde::Serialize;
use ticket_booking_config::StoreConfig;
use ticket_booking_store::Site;
use tracing::info;

use crate::bookings::BookingList;
use crate::form::Notice;
use crate::record::{
    BookingRecord, DropdownOption, FoodPreference, Gender, IdentityProof, SeatType, CITIES,
    PASSENGER_COUNTS, TRAVEL_TIMES,
};
use crate::submission::SubmissionPipeline;
use crate::validation::{FieldErrors, Step};
use crate::wizard::Wizard;

pub const HEADING: &str = "Ticket Booking";

/// What the host hands to a web part when mounting it.
#[derive(Clone)]
pub struct WebPartContext {
    pub site: Site,
    pub list_title: String,
    pub document_folder: String,
}

impl WebPartContext {
    pub fn new(site: Site, config: &StoreConfig) -> Self {
        Self {
            site,
            list_title: config.list_title.clone(),
            document_folder: config.document_folder.clone(),
        }
    }

    pub fn bookings(&self) -> BookingList {
        BookingList::new(Arc::clone(&self.site.lists), self.list_title.clone())
    }

    pub fn pipeline(&self) -> SubmissionPipeline {
        SubmissionPipeline::new(&self.site, &self.list_title, &self.document_folder)
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Back,
    Next,
    Submit,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StepTab {
    pub index: usize,
    pub title: &'static str,
    pub active: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub genders: Vec<DropdownOption>,
    pub cities: Vec<DropdownOption>,
    pub travel_times: Vec<DropdownOption>,
    pub passenger_counts: &'static [usize],
    pub identity_proofs: Vec<DropdownOption>,
    pub seat_types: Vec<DropdownOption>,
    pub food_preferences: Vec<DropdownOption>,
}

impl FormOptions {
    fn new() -> Self {
        Self {
            genders: Gender::options(),
            cities: CITIES
                .iter()
                .map(|&city| DropdownOption {
                    key: city,
                    text: city,
                })
                .collect(),
            travel_times: TRAVEL_TIMES
                .iter()
                .map(|&(key, text)| DropdownOption { key, text })
                .collect(),
            passenger_counts: PASSENGER_COUNTS,
            identity_proofs: IdentityProof::options(),
            seat_types: SeatType::options(),
            food_preferences: FoodPreference::options(),
        }
    }
}

/// Everything needed to draw the active step.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingView<'a> {
    pub heading: &'static str,
    pub description: &'a str,
    pub step: Step,
    pub step_title: &'static str,
    pub progress_label: String,
    pub percent_complete: f64,
    pub steps: Vec<StepTab>,
    pub record: &'a BookingRecord,
    pub errors: &'a FieldErrors,
    pub notice: Option<&'a Notice>,
    pub buttons: Vec<Button>,
    pub submitting: bool,
    pub options: FormOptions,
}

/// A mounted booking form.
pub struct BookingWebPart {
    description: String,
    wizard: Wizard,
}

impl BookingWebPart {
    /// Mounts the form with an empty draft on the first step.
    pub fn render(context: &WebPartContext, description: impl Into<String>) -> Self {
        let description = description.into();
        info!("mounting the booking form on {}", context.list_title);
        Self {
            description,
            wizard: Wizard::new(Arc::new(context.pipeline())),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut Wizard {
        &mut self.wizard
    }

    pub fn view(&self) -> BookingView<'_> {
        let step = self.wizard.step();
        let form = self.wizard.form();
        let mut buttons = Vec::new();
        if step.previous().is_some() {
            buttons.push(Button::Back);
        }
        buttons.push(if step.is_last() {
            Button::Submit
        } else {
            Button::Next
        });

        #[allow(clippy::cast_precision_loss)]
        let percent_complete = (step.index() + 1) as f64 / Step::COUNT as f64;

        BookingView {
            heading: HEADING,
            description: &self.description,
            step,
            step_title: step.title(),
            progress_label: format!("Step {} of {}", step.index() + 1, Step::COUNT),
            percent_complete,
            steps: Step::ALL
                .iter()
                .map(|tab| StepTab {
                    index: tab.index(),
                    title: tab.title(),
                    active: *tab == step,
                })
                .collect(),
            record: &form.record,
            errors: &form.errors,
            notice: form.notice.as_ref(),
            buttons,
            submitting: self.wizard.is_submitting(),
            options: FormOptions::new(),
        }
    }

    /// Unmounts the form. The draft is dropped.
    pub fn teardown(self) {
        info!("unmounting the booking form");
    }
}
