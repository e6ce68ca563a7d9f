use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::form::{
    FieldChange, FormError, FormState, Notice, BOOKING_SUCCESSFUL, FILL_REQUIRED_FIELDS,
    SAVE_FAILED, UPLOAD_FAILED,
};
use crate::record::UploadedFile;
use crate::submission::{SubmissionPipeline, SubmitError, Submitted};
use crate::validation::{validate_all, Step};

/// Owns the draft and moves it through the six steps.
pub struct Wizard {
    form: FormState,
    step: Step,
    pipeline: Arc<SubmissionPipeline>,
}

impl Wizard {
    pub fn new(pipeline: Arc<SubmissionPipeline>) -> Self {
        Self {
            form: FormState::new(),
            step: Step::UserInformation,
            pipeline,
        }
    }

    pub const fn form(&self) -> &FormState {
        &self.form
    }

    pub const fn step(&self) -> Step {
        self.step
    }

    pub fn is_submitting(&self) -> bool {
        self.pipeline.is_busy()
    }

    pub fn dismiss_notice(&mut self) {
        self.form.notice = None;
    }

    pub fn apply(&mut self, change: FieldChange, today: NaiveDate) -> Result<(), FormError> {
        self.form.apply(change, today)
    }

    pub fn set_number_of_passengers(&mut self, count: usize) {
        self.form.set_number_of_passengers(count);
    }

    pub fn attach_file(&mut self, file: UploadedFile) {
        self.form.attach_file(file);
    }

    pub fn remove_file(&mut self) {
        self.form.remove_file();
    }

    /// Validates the current step and records its errors. `true` when it has none.
    fn validate_current(&mut self, today: NaiveDate) -> bool {
        let errors = self.step.validate(&self.form.record, today);
        let valid = errors.is_empty();
        self.form.merge_step_errors(self.step, errors);
        valid
    }

    /// Moves forward when the current step is valid.
    pub fn next(&mut self, today: NaiveDate) -> bool {
        self.dismiss_notice();
        let Some(next) = self.step.next() else {
            return false;
        };
        if !self.validate_current(today) {
            debug!("{} blocks moving on", self.step.title());
            return false;
        }
        self.step = next;
        true
    }

    /// Moves backward without validating.
    pub fn back(&mut self) -> bool {
        self.dismiss_notice();
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                true
            }
            None => false,
        }
    }

    /// Jumps to a step. Jumping ahead requires the current step to be valid.
    pub fn select(&mut self, index: usize, today: NaiveDate) -> bool {
        self.dismiss_notice();
        let Some(target) = Step::from_index(index) else {
            self.form.notice = Some(Notice::error(FILL_REQUIRED_FIELDS));
            return false;
        };
        if target > self.step && !self.validate_current(today) {
            return false;
        }
        self.step = target;
        true
    }

    /// Validates every step, then runs the submission pipeline.
    ///
    /// On success the draft is reset and the wizard returns to the first step. On failure the
    /// draft stays as it was.
    pub async fn submit(&mut self, today: NaiveDate) -> Result<Submitted, SubmitError> {
        self.dismiss_notice();
        if let Err((step, errors)) = validate_all(&self.form.record, today) {
            self.form.merge_step_errors(step, errors.clone());
            self.step = step;
            self.form.notice = Some(Notice::error(FILL_REQUIRED_FIELDS));
            return Err(SubmitError::Invalid { step, errors });
        }

        match self.pipeline.submit(&self.form.record).await {
            Ok(submitted) => {
                info!("booking {} submitted", submitted.id);
                self.form.reset();
                self.step = Step::UserInformation;
                self.form.notice = Some(Notice::success(BOOKING_SUCCESSFUL));
                Ok(submitted)
            }
            Err(err) => {
                match &err {
                    SubmitError::UploadFailed(_) => {
                        self.form.notice = Some(Notice::error(UPLOAD_FAILED));
                    }
                    SubmitError::PersistenceFailed(_) => {
                        self.form.notice = Some(Notice::error(SAVE_FAILED));
                    }
                    SubmitError::Invalid { .. } | SubmitError::AlreadySubmitting => {}
                }
                Err(err)
            }
        }
    }
}
