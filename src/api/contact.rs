use crate::api::{ApiResponse, Library};
use crate::model::ContactForm;
use crate::validation;

impl Library {
    /// Contact messages are only logged; there is no mail backend.
    pub async fn submit_contact_form(&self, form: &ContactForm) -> ApiResponse<bool> {
        if let Err(err) = validation::validate_contact(form) {
            tracing::warn!(%err, "contact form rejected");
            let mut resp = ApiResponse::fail(err.to_string());
            resp.data = Some(false);
            return resp;
        }
        tracing::info!(
            email = %form.email.trim(),
            subject = %form.subject.trim(),
            "contact form submitted"
        );
        ApiResponse::ok(true)
    }
}
