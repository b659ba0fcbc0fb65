//! Record types used by the demo programs

use chrono::{DateTime, Utc};
use quadgraph_core::{NodeRef, Result, ValueKind};
use quadgraph_schema::{Decodable, Encodable, Entity, EntityDescriptor, FieldBinding, Record};
use serde::{Deserialize, Serialize};

/// Type tag of administrator records
pub const ADMIN_TYPE: &str = "Admin";

/// Type tag of user records
pub const USER_TYPE: &str = "User";

/// Type tag of post records
pub const POST_TYPE: &str = "Post";

/// Type tag of clinic records
pub const CLINIC_TYPE: &str = "Clinic";

/// Type tag of opening-hours records
pub const OPENING_HOURS_TYPE: &str = "schema:OpeningHoursSpecification";

// ========== Admin ==========

/// An administrator account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Admin {
    pub id: Option<NodeRef>,
    pub name: String,
    pub email: String,
    pub hashed_password: String,

    /// Plain-text password; never written to the store
    pub password: String,
}

impl Encodable for Admin {
    fn to_record(&self) -> Record {
        Record::new(ADMIN_TYPE)
            .with_id(self.id.clone())
            .with("name", self.name.as_str())
            .with("email", self.email.as_str())
            .with("hashed_password", self.hashed_password.as_str())
            .with("password", self.password.as_str())
    }
}

impl Decodable for Admin {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.value_or_default("name")?,
            email: record.require("email")?,
            hashed_password: record.value_or_default("hashed_password")?,
            password: String::new(),
        })
    }
}

impl Entity for Admin {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::typed(ADMIN_TYPE, ADMIN_TYPE)
            .field(FieldBinding::scalar("name", "name", ValueKind::String))
            .field(FieldBinding::scalar("email", "email", ValueKind::String).required())
            .field(FieldBinding::scalar("hashed_password", "hashed_password", ValueKind::String))
            .field(FieldBinding::scalar("password", "password", ValueKind::String).excluded())
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

// ========== Users and posts ==========

/// A user who follows other users
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<NodeRef>,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub follows: Vec<NodeRef>,
}

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }
}

impl Encodable for User {
    fn to_record(&self) -> Record {
        Record::new(USER_TYPE)
            .with_id(self.id.clone())
            .with("name", self.name.as_str())
            .with("email", self.email.as_str())
            .with("hashed_password", self.hashed_password.as_str())
            .with_list("follows", self.follows.iter().cloned())
    }
}

impl Decodable for User {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.value_or_default("name")?,
            email: record.value_or_default("email")?,
            hashed_password: record.value_or_default("hashed_password")?,
            follows: record.list("follows")?,
        })
    }
}

impl Entity for User {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::typed(USER_TYPE, USER_TYPE)
            .field(FieldBinding::scalar("name", "name", ValueKind::String))
            .field(FieldBinding::scalar("email", "email", ValueKind::String))
            .field(FieldBinding::scalar("hashed_password", "hashed_password", ValueKind::String))
            .field(FieldBinding::node("follows", "follows").repeated())
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

/// A message written by a user
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Option<NodeRef>,
    pub author: NodeRef,
    pub message: String,
    pub created: DateTime<Utc>,
}

impl Post {
    pub fn new(author: &NodeRef, message: &str, created: DateTime<Utc>) -> Self {
        Self {
            id: None,
            author: author.clone(),
            message: message.to_string(),
            created,
        }
    }
}

impl Encodable for Post {
    fn to_record(&self) -> Record {
        Record::new(POST_TYPE)
            .with_id(self.id.clone())
            .with("author", self.author.clone())
            .with("message", self.message.as_str())
            .with("created", self.created)
    }
}

impl Decodable for Post {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            author: record.require("author")?,
            message: record.value_or_default("message")?,
            created: record.require("created")?,
        })
    }
}

impl Entity for Post {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::typed(POST_TYPE, POST_TYPE)
            .field(FieldBinding::node("author", "author").required())
            .field(FieldBinding::scalar("message", "msg", ValueKind::String))
            .field(FieldBinding::scalar("created", "created", ValueKind::Timestamp).required())
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

/// A user seen together with everything they have written
///
/// Read-only view: any node with a name and at least one post qualifies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAndPosts {
    pub id: Option<NodeRef>,
    pub name: String,
    pub posts: Vec<Post>,
}

impl Encodable for UserAndPosts {
    fn to_record(&self) -> Record {
        let posts: Vec<Record> = self.posts.iter().map(Post::to_record).collect();
        Record::new("UserAndPosts")
            .with_id(self.id.clone())
            .with("name", self.name.as_str())
            .with("posts", posts)
    }
}

impl Decodable for UserAndPosts {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.value_or_default("name")?,
            posts: record.records("posts")?,
        })
    }
}

impl Entity for UserAndPosts {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::projection("UserAndPosts")
            .field(FieldBinding::scalar("name", "name", ValueKind::String).required())
            .field(
                FieldBinding::nested("posts", "author", POST_TYPE)
                    .reverse()
                    .repeated()
                    .required(),
            )
    }

    fn nested_descriptors() -> Vec<EntityDescriptor> {
        vec![Post::descriptor()]
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

// ========== Clinics ==========

/// Days of the week as schema.org nodes
pub mod days {
    pub const MONDAY: &str = "http://schema.org/Monday";
    pub const TUESDAY: &str = "http://schema.org/Tuesday";
    pub const WEDNESDAY: &str = "http://schema.org/Wednesday";
    pub const THURSDAY: &str = "http://schema.org/Thursday";
    pub const FRIDAY: &str = "http://schema.org/Friday";
    pub const SATURDAY: &str = "http://schema.org/Saturday";
    pub const SUNDAY: &str = "http://schema.org/Sunday";
}

/// Opening hours for one day of the week
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(skip)]
    pub id: Option<NodeRef>,

    /// Day of the week, as the IRI of a schema.org day
    pub day: String,

    /// Position when a clinic opens more than once a day
    #[serde(default)]
    pub slot: i64,

    /// Opening time, `HH:MM` or `HH:MM:SS`
    pub opens: String,
    pub closes: String,
}

impl Encodable for OpeningHours {
    fn to_record(&self) -> Record {
        let day = (!self.day.is_empty()).then(|| NodeRef::iri(self.day.as_str()));
        Record::new(OPENING_HOURS_TYPE)
            .with_id(self.id.clone())
            .with_opt("day", day)
            .with("slot", self.slot)
            .with("opens", self.opens.as_str())
            .with("closes", self.closes.as_str())
    }
}

impl Decodable for OpeningHours {
    fn from_record(record: &Record) -> Result<Self> {
        let day: Option<NodeRef> = record.value("day")?;
        Ok(Self {
            id: record.id.clone(),
            day: day.map(|d| d.name().to_string()).unwrap_or_default(),
            slot: record.value_or_default("slot")?,
            opens: record.value_or_default("opens")?,
            closes: record.value_or_default("closes")?,
        })
    }
}

impl Entity for OpeningHours {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::typed(OPENING_HOURS_TYPE, OPENING_HOURS_TYPE)
            .field(FieldBinding::node("day", "schema:dayOfWeek"))
            .field(FieldBinding::scalar("slot", "slot", ValueKind::Integer))
            .field(FieldBinding::scalar("opens", "schema:opens", ValueKind::String))
            .field(FieldBinding::scalar("closes", "schema:closes", ValueKind::String))
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

/// A clinic with its weekly opening hours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    #[serde(skip)]
    pub id: Option<NodeRef>,

    pub name: String,

    #[serde(default)]
    pub address: String,

    /// Administrator who registered the clinic
    #[serde(skip)]
    pub created_by: Option<NodeRef>,

    #[serde(default)]
    pub office_tel: String,

    #[serde(default, alias = "Hours")]
    pub hours: Vec<OpeningHours>,
}

impl Encodable for Clinic {
    fn to_record(&self) -> Record {
        let hours: Vec<Record> = self.hours.iter().map(OpeningHours::to_record).collect();
        Record::new(CLINIC_TYPE)
            .with_id(self.id.clone())
            .with("name", self.name.as_str())
            .with("address", self.address.as_str())
            .with_opt("created_by", self.created_by.clone())
            .with("office_tel", self.office_tel.as_str())
            .with("hours", hours)
    }
}

impl Decodable for Clinic {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.require("name")?,
            address: record.value_or_default("address")?,
            created_by: record.value("created_by")?,
            office_tel: record.value_or_default("office_tel")?,
            hours: record.records("hours")?,
        })
    }
}

impl Entity for Clinic {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::typed(CLINIC_TYPE, CLINIC_TYPE)
            .field(FieldBinding::scalar("name", "name", ValueKind::String).required())
            .field(FieldBinding::scalar("address", "address", ValueKind::String))
            .field(FieldBinding::node("created_by", "createdBy").optional())
            .field(FieldBinding::scalar("office_tel", "officeTel", ValueKind::String))
            .field(
                FieldBinding::nested("hours", "schema:openingHoursSpecification", OPENING_HOURS_TYPE)
                    .repeated(),
            )
    }

    fn nested_descriptors() -> Vec<EntityDescriptor> {
        vec![OpeningHours::descriptor()]
    }

    fn id(&self) -> Option<&NodeRef> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: NodeRef) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_valid() {
        Admin::descriptor().validate().unwrap();
        User::descriptor().validate().unwrap();
        Post::descriptor().validate().unwrap();
        UserAndPosts::descriptor().validate().unwrap();
        Clinic::descriptor().validate().unwrap();
        OpeningHours::descriptor().validate().unwrap();
    }

    #[test]
    fn test_password_is_not_written() {
        let binding = Admin::descriptor();
        assert!(!binding.binding("password").unwrap().is_written());
        assert!(binding.binding("hashed_password").unwrap().is_written());
    }

    #[test]
    fn test_clinic_from_json() {
        let clinic: Clinic = serde_json::from_str(
            r#"{
                "name": "Downtown",
                "address": "1 Main st",
                "officeTel": "555 0100",
                "Hours": [
                    {"day": "http://schema.org/Monday", "slot": 0, "opens": "09:00", "closes": "17:00"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(clinic.office_tel, "555 0100");
        assert_eq!(clinic.hours.len(), 1);
        assert_eq!(clinic.hours[0].day, days::MONDAY);
        assert!(clinic.id.is_none());
    }

    #[test]
    fn test_opening_hours_record_round_trip() {
        let hours = OpeningHours {
            id: None,
            day: days::FRIDAY.to_string(),
            slot: 1,
            opens: "12:00".to_string(),
            closes: "14:00".to_string(),
        };
        assert_eq!(OpeningHours::from_record(&hours.to_record()).unwrap(), hours);
    }
}
