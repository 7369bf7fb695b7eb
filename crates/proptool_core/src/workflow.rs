use anyhow::{Result, bail};
use serde_json::{Map, Value};

use crate::normalize::normalize;
use crate::remote::{ImportedListing, ListingApi, ListingPreview};
use crate::schema::{self, PropertyType};
use crate::validate::{Diagnostic, has_errors, validate};

/// Resting states of an import session. The transient validating and
/// importing phases are spanned by blocking calls on `&mut self`, which is
/// also what keeps the two remote calls from ever running concurrently
/// within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SelectingCategory,
    Editing,
    ClientInvalid,
    RemoteValid,
    RemoteInvalid,
    Imported,
    Failed,
}

/// One two-phase import session: pick a category, paste a draft, validate
/// locally, validate remotely, import. Each session owns its draft,
/// normalized record, and diagnostics exclusively.
pub struct ImportSession {
    state: SessionState,
    category: Option<PropertyType>,
    draft_text: Option<String>,
    record: Option<Map<String, Value>>,
    diagnostics: Vec<Diagnostic>,
    preview: Option<ListingPreview>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::SelectingCategory,
            category: None,
            draft_text: None,
            record: None,
            diagnostics: Vec::new(),
            preview: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn category(&self) -> Option<PropertyType> {
        self.category
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn preview(&self) -> Option<&ListingPreview> {
        self.preview.as_ref()
    }

    pub fn record(&self) -> Option<&Map<String, Value>> {
        self.record.as_ref()
    }

    /// Pick or change the category. The selection is sticky for the rest
    /// of the session and is the sole authority on the effective property
    /// type. Changing it clears the pasted text and all diagnostics: the
    /// category-shape and nullability rules depend on it, so anything
    /// already reported would be stale.
    pub fn select_category(&mut self, category: PropertyType) {
        self.category = Some(category);
        self.draft_text = None;
        self.record = None;
        self.diagnostics.clear();
        self.preview = None;
        self.state = SessionState::Editing;
    }

    /// Accept pasted draft text. Requires a category selection first.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<()> {
        if self.category.is_none() {
            bail!("select a property type before pasting a draft");
        }
        self.draft_text = Some(text.into());
        self.record = None;
        self.diagnostics.clear();
        self.preview = None;
        self.state = SessionState::Editing;
        Ok(())
    }

    /// Local half of the validation phase: parse, normalize, apply the
    /// sticky category override, evaluate the rules. Returns true when no
    /// error-severity diagnostic exists (the record is client-valid).
    ///
    /// Err is reserved for misuse (no category or draft); parse errors and
    /// rule violations land in `diagnostics()`.
    pub fn validate_local(&mut self) -> Result<bool> {
        let Some(category) = self.category else {
            bail!("no property type selected");
        };
        let Some(text) = self.draft_text.clone() else {
            bail!("no draft to validate");
        };

        self.record = None;
        self.diagnostics.clear();
        self.preview = None;

        let draft: Value = match serde_json::from_str(&text) {
            Ok(draft) => draft,
            Err(error) => {
                self.diagnostics.push(Diagnostic::error(
                    "draft",
                    format!("draft is not valid JSON: {error}"),
                ));
                self.state = SessionState::ClientInvalid;
                return Ok(false);
            }
        };

        let mut record = normalize(&draft);
        record.insert(
            schema::PROPERTY_TYPE_FIELD.to_string(),
            Value::String(category.as_str().to_string()),
        );
        self.diagnostics = validate(&record, category);
        self.record = Some(record);

        if has_errors(&self.diagnostics) {
            self.state = SessionState::ClientInvalid;
            return Ok(false);
        }
        self.state = SessionState::Editing;
        Ok(true)
    }

    /// Full validation phase: the local half, then, only when the record
    /// is client-valid, the remote validate-only round trip. Returns true
    /// when the record is remote-valid. Remote failures land in
    /// `diagnostics()` rather than Err and clear any prior RemoteValid.
    pub fn validate(&mut self, api: &dyn ListingApi) -> Result<bool> {
        if !self.validate_local()? {
            return Ok(false);
        }

        let payload = import_payload(self.record.as_ref().expect("record just stored"));
        match api.validate_listing(&payload) {
            Ok(validation) if validation.valid => {
                self.preview = validation.preview;
                self.state = SessionState::RemoteValid;
                Ok(true)
            }
            Ok(validation) => {
                self.diagnostics.push(Diagnostic::error(
                    "remote",
                    validation
                        .error
                        .unwrap_or_else(|| "record rejected by remote validation".to_string()),
                ));
                self.state = SessionState::RemoteInvalid;
                Ok(false)
            }
            Err(error) => {
                self.diagnostics
                    .push(Diagnostic::error("remote", format!("{error:#}")));
                self.state = SessionState::RemoteInvalid;
                Ok(false)
            }
        }
    }

    /// Run the import phase. Only reachable after a successful remote
    /// validation, or again from `Failed` to retry without re-pasting.
    /// Success hands the new identifier to the caller and resets the
    /// session; failure keeps the normalized record and returns None.
    pub fn import(&mut self, api: &dyn ListingApi) -> Result<Option<ImportedListing>> {
        if !matches!(self.state, SessionState::RemoteValid | SessionState::Failed) {
            bail!("import is only available after remote validation succeeds");
        }
        let Some(record) = self.record.as_ref() else {
            bail!("no validated record to import");
        };

        match api.import_listing(&import_payload(record)) {
            Ok(listing) => {
                self.state = SessionState::Imported;
                self.reset();
                Ok(Some(listing))
            }
            Err(error) => {
                self.diagnostics
                    .push(Diagnostic::error("remote", format!("import failed: {error:#}")));
                self.state = SessionState::Failed;
                Ok(None)
            }
        }
    }

    /// Full reset (dialog close). Discards all session state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// The wire payload: the normalized record restricted to the accepted-key
/// whitelist. Unknown keys warn locally but never reach the server.
pub fn import_payload(record: &Map<String, Value>) -> Map<String, Value> {
    record
        .iter()
        .filter(|(key, _)| schema::is_known_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use anyhow::{Result, anyhow};
    use serde_json::{Map, Value, json};

    use super::{ImportSession, SessionState, import_payload};
    use crate::remote::{ImportedListing, ListingApi, ListingPreview, RemoteValidation};
    use crate::schema::PropertyType;
    use crate::validate::Severity;

    #[derive(Default)]
    struct FakeApi {
        validations: RefCell<VecDeque<Result<RemoteValidation>>>,
        imports: RefCell<VecDeque<Result<ImportedListing>>>,
        validate_payloads: RefCell<Vec<Map<String, Value>>>,
        import_payloads: RefCell<Vec<Map<String, Value>>>,
    }

    impl FakeApi {
        fn accepting() -> Self {
            let api = Self::default();
            api.validations.borrow_mut().push_back(Ok(RemoteValidation {
                valid: true,
                preview: Some(ListingPreview {
                    title: Some("Casa X".to_string()),
                    property_type: Some("active".to_string()),
                    city: Some("Tulum".to_string()),
                    price: Some(450_000.0),
                }),
                error: None,
            }));
            api.imports.borrow_mut().push_back(Ok(ImportedListing {
                id: "listing-41".to_string(),
            }));
            api
        }
    }

    impl ListingApi for FakeApi {
        fn validate_listing(&self, record: &Map<String, Value>) -> Result<RemoteValidation> {
            self.validate_payloads.borrow_mut().push(record.clone());
            self.validations
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(RemoteValidation { valid: true, preview: None, error: None }))
        }

        fn import_listing(&self, record: &Map<String, Value>) -> Result<ImportedListing> {
            self.import_payloads.borrow_mut().push(record.clone());
            self.imports
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(ImportedListing { id: "listing-1".to_string() }))
        }
    }

    fn content_words(count: usize) -> String {
        (0..count)
            .map(|index| format!("word{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn active_draft_text() -> String {
        json!({
            "title": "Casa X",
            "property_type": "active",
            "status": "for_sale",
            "city": "Tulum",
            "country": "Mexico",
            "short_description": "Two-bedroom home near the beach.",
            "property_categories": ["apartment"],
            "content": content_words(250),
        })
        .to_string()
    }

    #[test]
    fn happy_path_validates_imports_and_resets() {
        let api = FakeApi::accepting();
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft(active_draft_text()).expect("draft");

        assert!(session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::RemoteValid);
        assert_eq!(
            session.preview().and_then(|preview| preview.title.as_deref()),
            Some("Casa X")
        );

        let imported = session.import(&api).expect("import").expect("id");
        assert_eq!(imported.id, "listing-41");
        assert_eq!(session.state(), SessionState::SelectingCategory);
        assert!(session.diagnostics().is_empty());
        assert!(session.record().is_none());
    }

    #[test]
    fn sticky_category_overrides_the_pasted_property_type() {
        let api = FakeApi::default();
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Development);
        // The draft claims "active" and carries single-unit fields.
        let draft = json!({
            "title": "Torre Y",
            "property_type": "active",
            "status": "for_sale",
            "city": "Tulum",
            "country": "Mexico",
            "short_description": "Pre-construction tower.",
            "property_categories": ["apartment", "penthouse"],
            "content": content_words(250),
            "price_usd_from": 380000,
            "price_usd_to": 910000,
        })
        .to_string();
        session.set_draft(draft).expect("draft");

        assert!(session.validate(&api).expect("validate"));
        let payload = &api.validate_payloads.borrow()[0];
        assert_eq!(payload["property_type"], json!("development"));
    }

    #[test]
    fn malformed_json_yields_one_parse_diagnostic_with_location() {
        let api = FakeApi::default();
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft("{\"title\": \n oops}").expect("draft");

        assert!(!session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::ClientInvalid);
        assert_eq!(session.diagnostics().len(), 1);
        let diagnostic = &session.diagnostics()[0];
        assert_eq!(diagnostic.field, "draft");
        assert!(diagnostic.message.contains("line 2"), "{diagnostic:?}");
        assert!(api.validate_payloads.borrow().is_empty());
    }

    #[test]
    fn client_errors_skip_the_remote_round_trip() {
        let api = FakeApi::default();
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft(json!({"title": "No content"}).to_string()).expect("draft");

        assert!(!session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::ClientInvalid);
        assert!(api.validate_payloads.borrow().is_empty());
        assert!(session.import(&api).is_err());
    }

    #[test]
    fn remote_rejection_surfaces_the_error_and_recovers_on_edit() {
        let api = FakeApi::default();
        api.validations
            .borrow_mut()
            .push_back(Ok(RemoteValidation {
                valid: false,
                preview: None,
                error: Some("duplicate slug".to_string()),
            }));
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft(active_draft_text()).expect("draft");

        assert!(!session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::RemoteInvalid);
        assert!(session.diagnostics().iter().any(|diagnostic| {
            diagnostic.field == "remote"
                && diagnostic.severity == Severity::Error
                && diagnostic.message == "duplicate slug"
        }));

        // The operator edits and re-validates; the next round trip accepts.
        session.set_draft(active_draft_text()).expect("draft");
        assert!(session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::RemoteValid);
    }

    #[test]
    fn transport_failure_on_validate_clears_prior_remote_valid() {
        let api = FakeApi::default();
        api.validations.borrow_mut().push_back(Ok(RemoteValidation {
            valid: true,
            preview: None,
            error: None,
        }));
        api.validations
            .borrow_mut()
            .push_back(Err(anyhow!("connection refused")));

        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft(active_draft_text()).expect("draft");
        assert!(session.validate(&api).expect("validate"));

        assert!(!session.validate(&api).expect("validate"));
        assert_eq!(session.state(), SessionState::RemoteInvalid);
        assert!(session.preview().is_none());
    }

    #[test]
    fn failed_import_retains_the_record_for_retry() {
        let api = FakeApi::default();
        api.imports
            .borrow_mut()
            .push_back(Err(anyhow!("gateway timeout")));
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft(active_draft_text()).expect("draft");
        assert!(session.validate(&api).expect("validate"));

        assert!(session.import(&api).expect("import").is_none());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.record().is_some());
        assert!(session.diagnostics().iter().any(|diagnostic| {
            diagnostic.message.contains("gateway timeout")
        }));

        // Retry without re-pasting.
        let imported = session.import(&api).expect("retry").expect("id");
        assert_eq!(imported.id, "listing-1");
        assert_eq!(session.state(), SessionState::SelectingCategory);
    }

    #[test]
    fn changing_category_clears_draft_and_diagnostics() {
        let api = FakeApi::default();
        let mut session = ImportSession::new();
        session.select_category(PropertyType::Active);
        session.set_draft("not json").expect("draft");
        assert!(!session.validate(&api).expect("validate"));
        assert!(!session.diagnostics().is_empty());

        session.select_category(PropertyType::Land);
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.diagnostics().is_empty());
        assert!(session.validate(&api).is_err(), "draft must be cleared");
    }

    #[test]
    fn draft_before_category_selection_is_rejected() {
        let mut session = ImportSession::new();
        assert!(session.set_draft("{}").is_err());
    }

    #[test]
    fn import_payload_strips_unknown_keys() {
        let mut record = Map::new();
        record.insert("title".to_string(), json!("Casa X"));
        record.insert("mystery".to_string(), json!(1));
        let payload = import_payload(&record);
        assert!(payload.contains_key("title"));
        assert!(!payload.contains_key("mystery"));
    }
}
