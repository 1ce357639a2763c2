//! Payload builder.
//!
//! Turns a parsed write request into the typed payload a repository takes.
//! Structured fields sent as text are parsed, degrading to `{}` when the text
//! is not JSON. An image field is only set when a file was uploaded for it;
//! otherwise the column is left out of the write and the stored reference
//! stays as it is. A partial update therefore never clears an image unless a
//! replacement was uploaded.

use serde_json::{Map, Value};

use crate::models::{
    Community, CommunityChanges, Event, EventChanges, NewCommunity, NewEvent, NewUser, User,
    UserChanges,
};
use crate::uploads::{FormFields, ImageCategory, StorageError, UploadForm, UploadManager};
use crate::validation::{parse_bool, parse_cost, parse_date, parse_time};

/// A payload plus the file bookkeeping its write needs.
#[derive(Debug)]
pub struct Merged<T> {
    pub payload: T,
    /// Files relocated for this request. Discard them if the write fails.
    pub relocated: Vec<String>,
    /// References the write replaces. Delete them once it succeeded.
    pub superseded: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid payload: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Canonical structured value. Text is parsed as JSON; text that does not
/// parse becomes an empty object instead of failing the request.
pub fn parse_structured(value: &Value) -> Value {
    match value {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Unparsable structured field, storing empty object");
            Value::Object(Map::new())
        }),
        other => other.clone(),
    }
}

fn structured(fields: &FormFields, name: &str) -> Option<Value> {
    match fields.raw(name)? {
        Value::Null => None,
        value => Some(parse_structured(value)),
    }
}

fn required(fields: &FormFields, name: &str, message: &str, errors: &mut Vec<String>) -> String {
    match fields.text(name).filter(|v| !v.trim().is_empty()) {
        Some(value) => value,
        None => {
            errors.push(message.to_string());
            String::new()
        }
    }
}

/// Blank text counts as absent; anything else must parse.
fn typed<T>(
    fields: &FormFields,
    name: &str,
    parse: fn(&str) -> Option<T>,
    message: &str,
    errors: &mut Vec<String>,
) -> Option<T> {
    let raw = fields.text(name).filter(|v| !v.trim().is_empty())?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        errors.push(message.to_string());
    }
    parsed
}

fn check(errors: Vec<String>) -> Result<(), PayloadError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PayloadError::Invalid(errors))
    }
}

/// Relocates staged images for one resource and records what moved.
struct Images<'a> {
    uploads: &'a UploadManager,
    category: ImageCategory,
    relocated: Vec<String>,
    superseded: Vec<String>,
}

impl<'a> Images<'a> {
    fn new(uploads: &'a UploadManager, category: ImageCategory) -> Self {
        Self {
            uploads,
            category,
            relocated: Vec::new(),
            superseded: Vec::new(),
        }
    }

    /// `existing` is `None` on create, `Some(current column)` on update. The
    /// current value is only used to mark it superseded, never written back.
    async fn merge(
        &mut self,
        form: &mut UploadForm,
        field: &'static str,
        existing: Option<&Option<String>>,
    ) -> Result<Option<String>, StorageError> {
        let staged = form.take_file(field);
        match self.uploads.relocate(staged, self.category, field).await {
            Ok(Some(reference)) => {
                self.relocated.push(reference.clone());
                if let Some(Some(previous)) = existing {
                    self.superseded.push(previous.clone());
                }
                Ok(Some(reference))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.uploads.discard(&self.relocated).await;
                Err(e)
            }
        }
    }

    fn finish<T>(self, payload: T) -> Merged<T> {
        Merged {
            payload,
            relocated: self.relocated,
            superseded: self.superseded,
        }
    }
}

pub async fn new_user(
    mut form: UploadForm,
    password_hash: String,
    uploads: &UploadManager,
) -> Result<Merged<NewUser>, PayloadError> {
    let fields = &form.fields;
    let mut errors = Vec::new();
    let name = required(fields, "name", "Name is required", &mut errors);
    let email = required(fields, "email", "Valid email is required", &mut errors);
    let phone = fields.text("phone").filter(|p| !p.is_empty());
    let interest = fields.list("interest");
    check(errors)?;

    let mut images = Images::new(uploads, ImageCategory::User);
    let image = images.merge(&mut form, "image", None).await?;

    Ok(images.finish(NewUser {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        password: password_hash,
        phone,
        interest,
        image,
    }))
}

pub async fn user_changes(
    mut form: UploadForm,
    password_hash: Option<String>,
    existing: &User,
    uploads: &UploadManager,
) -> Result<Merged<UserChanges>, PayloadError> {
    let fields = &form.fields;
    let name = fields.text("name").map(|n| n.trim().to_string());
    let email = fields.text("email").map(|e| e.trim().to_string());
    let phone = fields.text("phone");
    let interest = fields.list("interest");

    let mut images = Images::new(uploads, ImageCategory::User);
    let image = images.merge(&mut form, "image", Some(&existing.image)).await?;

    Ok(images.finish(UserChanges {
        name,
        email,
        password: password_hash,
        phone,
        interest,
        image,
    }))
}

pub async fn new_community(
    mut form: UploadForm,
    uploads: &UploadManager,
) -> Result<Merged<NewCommunity>, PayloadError> {
    let fields = &form.fields;
    let mut errors = Vec::new();
    let name = required(fields, "name", "Community name is required", &mut errors);
    let category = required(fields, "category", "Category is required", &mut errors);
    let contact = required(fields, "contact", "Contact information is required", &mut errors);
    check(errors)?;

    let sub_category = fields.text("sub_category");
    let address = fields.text("address");
    let email = fields.text("email").filter(|e| !e.is_empty());
    let social_links = structured(fields, "social_links");
    let description = fields.text("description");
    let in_charge = fields.text("in_charge");

    let mut images = Images::new(uploads, ImageCategory::Community);
    let logo = images.merge(&mut form, "logo", None).await?;
    let image = images.merge(&mut form, "image", None).await?;

    Ok(images.finish(NewCommunity {
        name,
        category,
        sub_category,
        contact,
        address,
        email,
        social_links,
        logo,
        image,
        description,
        in_charge,
    }))
}

pub async fn community_changes(
    mut form: UploadForm,
    existing: &Community,
    uploads: &UploadManager,
) -> Result<Merged<CommunityChanges>, PayloadError> {
    let fields = &form.fields;
    let changes = CommunityChanges {
        name: fields.text("name"),
        category: fields.text("category"),
        sub_category: fields.text("sub_category"),
        contact: fields.text("contact"),
        address: fields.text("address"),
        email: fields.text("email"),
        social_links: structured(fields, "social_links"),
        description: fields.text("description"),
        in_charge: fields.text("in_charge"),
        logo: None,
        image: None,
    };

    let mut images = Images::new(uploads, ImageCategory::Community);
    let logo = images.merge(&mut form, "logo", Some(&existing.logo)).await?;
    let image = images.merge(&mut form, "image", Some(&existing.image)).await?;

    Ok(images.finish(CommunityChanges {
        logo,
        image,
        ..changes
    }))
}

pub async fn new_event(
    mut form: UploadForm,
    uploads: &UploadManager,
) -> Result<Merged<NewEvent>, PayloadError> {
    let fields = &form.fields;
    let mut errors = Vec::new();
    let event_name = required(fields, "event_name", "Event name is required", &mut errors);
    let event_date = typed(
        fields,
        "event_date",
        parse_date,
        "Valid event date (YYYY-MM-DD) is required",
        &mut errors,
    );
    let event_time = typed(
        fields,
        "event_time",
        parse_time,
        "Valid event time (HH:MM) is required",
        &mut errors,
    );
    let category = required(fields, "category", "Category is required", &mut errors);
    let cost = typed(fields, "cost", parse_cost, "Cost must be a number", &mut errors);
    let priority = typed(
        fields,
        "priority",
        parse_bool,
        "Priority must be true or false",
        &mut errors,
    );

    let (Some(event_date), Some(event_time)) = (event_date, event_time) else {
        if errors.is_empty() {
            errors.push("Event date and time are required".to_string());
        }
        return Err(PayloadError::Invalid(errors));
    };
    check(errors)?;

    let location = fields.text("location");
    let contact = structured(fields, "contact");
    let sub_category = fields.text("sub_category");
    let social_links = structured(fields, "social_links");
    let status = fields.text("status").filter(|s| !s.is_empty());

    let mut images = Images::new(uploads, ImageCategory::Event);
    let event_image = images.merge(&mut form, "event_image", None).await?;

    Ok(images.finish(NewEvent {
        event_name,
        event_date,
        event_time,
        cost,
        event_image,
        location,
        contact,
        category,
        sub_category,
        social_links,
        status,
        priority,
    }))
}

pub async fn event_changes(
    mut form: UploadForm,
    existing: &Event,
    uploads: &UploadManager,
) -> Result<Merged<EventChanges>, PayloadError> {
    let fields = &form.fields;
    let mut errors = Vec::new();
    let changes = EventChanges {
        event_name: fields.text("event_name"),
        event_date: typed(
            fields,
            "event_date",
            parse_date,
            "Valid event date (YYYY-MM-DD) is required",
            &mut errors,
        ),
        event_time: typed(
            fields,
            "event_time",
            parse_time,
            "Valid event time (HH:MM) is required",
            &mut errors,
        ),
        cost: typed(fields, "cost", parse_cost, "Cost must be a number", &mut errors),
        location: fields.text("location"),
        contact: structured(fields, "contact"),
        category: fields.text("category"),
        sub_category: fields.text("sub_category"),
        social_links: structured(fields, "social_links"),
        status: fields.text("status"),
        priority: typed(
            fields,
            "priority",
            parse_bool,
            "Priority must be true or false",
            &mut errors,
        ),
        event_image: None,
    };
    check(errors)?;

    let mut images = Images::new(uploads, ImageCategory::Event);
    let event_image = images
        .merge(&mut form, "event_image", Some(&existing.event_image))
        .await?;

    Ok(images.finish(EventChanges {
        event_image,
        ..changes
    }))
}
