#![allow(dead_code)]

use graph_hydrate::{
    Entity, EntityHandle, EntityMetadata, EntityType, InMemoryContext, PersistenceContext, Result,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Blog domain
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Entity)]
#[entity(table = "blogs")]
pub struct Blog {
    #[key]
    pub id: i64,
    pub name: String,
    pub owner_id: Option<i64>,
    #[serde(skip)]
    #[reference(target = Author, foreign_key = "owner_id")]
    pub owner: Option<EntityHandle>,
    #[serde(skip)]
    #[collection(target = Post, foreign_key = "blog_id")]
    pub posts: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Post {
    #[key]
    pub id: i64,
    pub blog_id: i64,
    pub author_id: Option<i64>,
    pub title: String,
    #[serde(skip)]
    #[reference(target = Author, foreign_key = "author_id")]
    pub author: Option<EntityHandle>,
    #[serde(skip)]
    #[collection(target = Comment, foreign_key = "post_id")]
    pub comments: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Comment {
    #[key]
    pub id: i64,
    pub post_id: i64,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Author {
    #[key]
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    #[collection(target = Post, foreign_key = "author_id")]
    pub posts: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Tag {
    #[key]
    pub id: i64,
    pub label: String,
}

pub fn blog(id: i64, name: &str, owner_id: Option<i64>) -> Blog {
    Blog {
        id,
        name: name.to_string(),
        owner_id,
        owner: None,
        posts: Vec::new(),
    }
}

pub fn post(id: i64, blog_id: i64, author_id: Option<i64>, title: &str) -> Post {
    Post {
        id,
        blog_id,
        author_id,
        title: title.to_string(),
        author: None,
        comments: Vec::new(),
    }
}

pub fn comment(id: i64, post_id: i64, body: &str) -> Comment {
    Comment {
        id,
        post_id,
        body: body.to_string(),
    }
}

pub fn author(id: i64, name: &str) -> Author {
    Author {
        id,
        name: name.to_string(),
        posts: Vec::new(),
    }
}

/// Blogs 1-3, authors 1-2, posts 10-12 (blog 1) and 20 (blog 2), comments.
pub fn blog_context() -> Result<InMemoryContext> {
    let mut ctx = InMemoryContext::new();
    ctx.register::<Blog>()
        .register::<Post>()
        .register::<Comment>()
        .register::<Author>()
        .register::<Tag>();

    ctx.insert_row(&author(1, "Ada"))?;
    ctx.insert_row(&author(2, "Linus"))?;

    ctx.insert_row(&blog(1, "Systems", Some(1)))?;
    ctx.insert_row(&blog(2, "Tooling", Some(2)))?;
    ctx.insert_row(&blog(3, "Drafts", None))?;

    ctx.insert_row(&post(10, 1, Some(1), "Ownership"))?;
    ctx.insert_row(&post(11, 1, Some(2), "Borrowing"))?;
    ctx.insert_row(&post(12, 1, None, "Lifetimes"))?;
    ctx.insert_row(&post(20, 2, Some(2), "Cargo"))?;

    ctx.insert_row(&comment(100, 10, "clear"))?;
    ctx.insert_row(&comment(101, 10, "thanks"))?;
    ctx.insert_row(&comment(102, 11, "more please"))?;
    ctx.insert_row(&comment(200, 20, "nice"))?;

    ctx.insert_row(&Tag {
        id: 1,
        label: "rust".to_string(),
    })?;
    Ok(ctx)
}

// ---------------------------------------------------------------------------
// Small single-purpose domains
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Passport {
    #[key]
    pub id: i64,
    pub holder_id: i64,
    #[serde(skip)]
    #[reference(target = Citizen, foreign_key = "holder_id")]
    pub holder: Option<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Citizen {
    #[key]
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    #[collection(target = Visa, foreign_key = "citizen_id")]
    pub visas: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Visa {
    #[key]
    pub id: i64,
    pub citizen_id: i64,
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Library {
    #[key]
    pub id: i64,
    #[serde(skip)]
    #[collection(target = Book, foreign_key = "library_id")]
    pub books: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Book {
    #[key]
    pub id: i64,
    pub library_id: i64,
    #[serde(skip)]
    #[collection(target = Chapter, foreign_key = "book_id")]
    pub chapters: Vec<EntityHandle>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Chapter {
    #[key]
    pub id: i64,
    pub book_id: i64,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Employee {
    #[key]
    pub id: i64,
    pub name: String,
    pub manager_id: Option<i64>,
    #[serde(skip)]
    #[reference(target = Employee, foreign_key = "manager_id")]
    pub manager: Option<EntityHandle>,
    #[serde(skip)]
    #[collection(target = Employee, foreign_key = "manager_id")]
    pub reports: Vec<EntityHandle>,
}

pub fn employee(id: i64, name: &str, manager_id: Option<i64>) -> Employee {
    Employee {
        id,
        name: name.to_string(),
        manager_id,
        manager: None,
        reports: Vec::new(),
    }
}

#[derive(Debug, Serialize, Deserialize, Entity)]
#[entity(table = "order_lines")]
pub struct OrderLine {
    #[key]
    pub order_id: i64,
    #[key]
    pub line_no: i32,
    pub sku: String,
    #[entity(skip)]
    pub unit_price: f64,
}

/// Mapped type without any key member.
#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Note {
    pub text: String,
}

/// Never registered with any context.
#[derive(Debug, Serialize, Deserialize, Entity)]
pub struct Ghost {
    #[key]
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Call recording
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LoadCollection(&'static str, String),
    LoadReference(&'static str, String),
    SetAutoDetect(bool),
}

/// Delegating context that records every side-effecting call.
pub struct RecordingContext<C> {
    pub inner: C,
    pub calls: Vec<Call>,
}

impl<C: PersistenceContext> RecordingContext<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: Vec::new(),
        }
    }

    pub fn loads_of(&self, relationship: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| match call {
                Call::LoadCollection(_, name) | Call::LoadReference(_, name) => name == relationship,
                Call::SetAutoDetect(_) => false,
            })
            .count()
    }

    pub fn load_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| !matches!(call, Call::SetAutoDetect(_)))
            .count()
    }
}

impl<C: PersistenceContext> PersistenceContext for RecordingContext<C> {
    fn entity_metadata(&self, entity_type: &EntityType) -> Option<EntityMetadata> {
        self.inner.entity_metadata(entity_type)
    }

    fn is_loaded(&self, entity: &EntityHandle, relationship: &str) -> Result<bool> {
        self.inner.is_loaded(entity, relationship)
    }

    fn load_collection(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        let owner = entity.entity_type()?.short_name();
        self.calls
            .push(Call::LoadCollection(owner, relationship.to_string()));
        self.inner.load_collection(entity, relationship)
    }

    fn load_reference(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        let owner = entity.entity_type()?.short_name();
        self.calls
            .push(Call::LoadReference(owner, relationship.to_string()));
        self.inner.load_reference(entity, relationship)
    }

    fn auto_detect_changes_enabled(&self) -> bool {
        self.inner.auto_detect_changes_enabled()
    }

    fn set_auto_detect_changes_enabled(&mut self, enabled: bool) {
        self.calls.push(Call::SetAutoDetect(enabled));
        self.inner.set_auto_detect_changes_enabled(enabled)
    }
}
