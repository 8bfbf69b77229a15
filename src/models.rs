use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::Role;

pub trait CatalogEntity: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: Uuid,
    #[serde(alias = "full_name")]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub actors_names: Vec<String>,
    #[serde(default)]
    pub writers_names: Vec<String>,
    #[serde(default)]
    pub directors_names: Vec<String>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub actors: Vec<NamedRef>,
    #[serde(default)]
    pub writers: Vec<NamedRef>,
    #[serde(default)]
    pub directors: Vec<NamedRef>,
}

impl CatalogEntity for Film {
    const KIND: &'static str = "film";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CatalogEntity for Genre {
    const KIND: &'static str = "genre";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    #[serde(alias = "full_name")]
    pub name: String,
}

impl CatalogEntity for Person {
    const KIND: &'static str = "person";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoleFilms {
    pub actor: Vec<Film>,
    pub writer: Vec<Film>,
    pub director: Vec<Film>,
}

impl RoleFilms {
    pub fn get(&self, role: Role) -> &[Film] {
        match role {
            Role::Actor => &self.actor,
            Role::Writer => &self.writer,
            Role::Director => &self.director,
        }
    }

    pub fn set(&mut self, role: Role, films: Vec<Film>) {
        match role {
            Role::Actor => self.actor = films,
            Role::Writer => self.writer = films,
            Role::Director => self.director = films,
        }
    }

    pub fn ids(&self, role: Role) -> Vec<Uuid> {
        self.get(role).iter().map(|f| f.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actor.is_empty() && self.writer.is_empty() && self.director.is_empty()
    }
}
