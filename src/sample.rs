//! Sample types for exercising queries: people, employees and a loader.

use crate::reflect::{Reflect, TypeInfo};
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const NAMES: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy", "mallory",
    "oscar", "peggy", "rob", "sybil", "trent", "victor", "walter",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MALE" => Some(Gender::Male),
            "FEMALE" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// A person. Only the name accessor is public; the rest of the accessors
/// are non-public and must be made invocable when resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Person {
    name: Option<String>,
    age: i32,
    gender: Option<Gender>,
    fired_near_retirement: bool,
}

impl Person {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str, age: i32) -> Self {
        Self {
            name: Some(name.to_string()),
            age,
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn age(&self) -> i32 {
        self.age
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = age;
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        self.gender = gender;
    }

    pub fn is_fired_near_retirement(&self) -> bool {
        self.fired_near_retirement
    }

    pub fn fire(&mut self) {
        self.fired_near_retirement = true;
    }

    pub fn hire(&mut self) {
        self.fired_near_retirement = false;
    }
}

impl Reflect for Person {
    fn type_info() -> Arc<TypeInfo> {
        TypeInfo::class::<Person>("Person")
            .getter("getName", |p: &Person| p.name.clone())
            .setter("setName", |p: &mut Person, name: Option<String>| {
                p.name = name;
                Ok(())
            })
            .private_getter("getAge", |p: &Person| p.age)
            .setter("setAge", |p: &mut Person, age: i32| {
                p.age = age;
                Ok(())
            })
            .private_getter("getGender", |p: &Person| {
                p.gender.map(|g| g.as_str().to_string())
            })
            .setter("setGender", |p: &mut Person, gender: Option<String>| {
                p.gender = match gender {
                    Some(s) => Some(
                        Gender::parse(&s).ok_or_else(|| format!("unknown gender '{}'", s))?,
                    ),
                    None => None,
                };
                Ok(())
            })
            .private_getter("isFiredNearRetirement", |p: &Person| {
                p.fired_near_retirement
            })
            .field(
                "name",
                |p: &Person| p.name.clone(),
                |p: &mut Person, name| p.name = name,
            )
            .field("age", |p: &Person| p.age, |p: &mut Person, age| p.age = age)
            .field(
                "firedNearRetirement",
                |p: &Person| p.fired_near_retirement,
                |p: &mut Person, fired| p.fired_near_retirement = fired,
            )
            .build()
    }
}

/// Things with a displayable name
pub trait Named {
    fn name(&self) -> Option<&str>;

    fn display_name(&self) -> String {
        self.name().unwrap_or("(unnamed)").to_string()
    }
}

/// The `Named` interface descriptor for implementor `T`
pub fn named_type_info<T: Named + Any>() -> Arc<TypeInfo> {
    TypeInfo::interface::<T>("Named")
        .getter("getDisplayName", |n: &T| n.display_name())
        .build()
}

/// An employee is a person with an id and an optional salary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Employee {
    #[serde(flatten)]
    pub person: Person,
    pub employee_id: i64,
    pub salary: Option<f64>,
}

impl Employee {
    pub fn new(person: Person, employee_id: i64, salary: Option<f64>) -> Self {
        Self {
            person,
            employee_id,
            salary,
        }
    }
}

impl Named for Employee {
    fn name(&self) -> Option<&str> {
        self.person.name()
    }
}

impl Reflect for Employee {
    fn type_info() -> Arc<TypeInfo> {
        TypeInfo::class::<Employee>("Employee")
            .extends::<Person>(|e| &e.person, |e| &mut e.person)
            .implements(named_type_info::<Employee>())
            .getter("getEmployeeId", |e: &Employee| e.employee_id)
            .getter("getSalary", |e: &Employee| e.salary)
            .setter("setSalary", |e: &mut Employee, salary: Option<f64>| {
                match salary {
                    Some(s) if s < 0.0 => Err(format!("negative salary {}", s)),
                    _ => {
                        e.salary = salary;
                        Ok(())
                    }
                }
            })
            .public_field(
                "employeeId",
                |e: &Employee| e.employee_id,
                |e: &mut Employee, id| e.employee_id = id,
            )
            .build()
    }
}

/// Load people from a JSON array file
pub fn load_people(path: impl AsRef<Path>) -> Result<Vec<Person>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let people: Vec<Person> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse people from {}", path.display()))?;
    if people.iter().any(|p| p.age < 0) {
        bail!("Negative age in {}", path.display());
    }
    Ok(people)
}

/// Generate `count` people deterministically from `seed`. Roughly one in
/// ten has no name and one in five has no gender, so queries see nulls.
pub fn generate_people(count: usize, seed: u64) -> Vec<Person> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let name = (!rng.gen_bool(0.1))
                .then(|| NAMES[rng.gen_range(0..NAMES.len())].to_string());
            let gender = (!rng.gen_bool(0.2)).then(|| {
                if rng.gen_bool(0.5) {
                    Gender::Male
                } else {
                    Gender::Female
                }
            });
            Person {
                name,
                age: rng.gen_range(0..100),
                gender,
                fired_near_retirement: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{AttributeResolver, MemberKind, PropertyAccessError};
    use crate::value::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_private_accessors_resolve() {
        let resolver = AttributeResolver::new();
        let info = Person::type_info();

        let age = resolver.getter(&info, "age").unwrap();
        assert_eq!(age.member_kind(), MemberKind::Method);
        assert_eq!(age.method_name(), Some("getAge"));
        assert!(age.is_accessible());
        assert_eq!(age.get(&Person::named("bob", 54)), Ok(Value::Integer(54)));

        let fired = resolver.getter(&info, "firedNearRetirement").unwrap();
        assert_eq!(fired.method_name(), Some("isFiredNearRetirement"));
    }

    #[test]
    fn test_employee_ancestry() {
        let resolver = AttributeResolver::new();
        let info = Employee::type_info();
        let employee = Employee::new(Person::named("carol", 61), 7, Some(1200.0));

        let age = resolver.getter(&info, "age").unwrap();
        assert_eq!(age.declaring_type(), "Person");
        assert_eq!(age.get(&employee), Ok(Value::Integer(61)));

        let display = resolver.getter(&info, "displayName").unwrap();
        assert_eq!(display.declaring_type(), "Named");
        assert_eq!(display.get(&employee), Ok(Value::from("carol")));

        let unnamed = Employee::default();
        assert_eq!(display.get(&unnamed), Ok(Value::from("(unnamed)")));
    }

    #[test]
    fn test_setters() {
        let resolver = AttributeResolver::new();
        let info = Employee::type_info();
        let mut employee = Employee::default();

        let age = resolver.setter(&info, "age").unwrap();
        age.set(&mut employee, Value::Integer(33)).unwrap();
        assert_eq!(employee.person.age(), 33);
        assert!(matches!(
            age.set(&mut employee, Value::Null),
            Err(PropertyAccessError::NullAssignment { .. })
        ));

        let gender = resolver.setter(&info, "gender").unwrap();
        gender.set(&mut employee, Value::from("female")).unwrap();
        assert_eq!(employee.person.gender(), Some(Gender::Female));
        assert!(matches!(
            gender.set(&mut employee, Value::from("robot")),
            Err(PropertyAccessError::SetterFailed { .. })
        ));

        let salary = resolver.setter(&info, "salary").unwrap();
        salary.set(&mut employee, Value::Integer(10)).unwrap();
        assert_eq!(employee.salary, Some(10.0));
        assert!(matches!(
            salary.set(&mut employee, Value::from("lots")),
            Err(PropertyAccessError::ValueMismatch { .. })
        ));
    }

    #[test]
    fn test_fire_and_hire() {
        let mut person = Person::named("dave", 58);
        person.fire();
        assert!(person.is_fired_near_retirement());
        person.hire();
        assert!(!person.is_fired_near_retirement());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let first = generate_people(50, 42);
        let second = generate_people(50, 42);
        assert_eq!(first, second);
        assert_eq!(first.len(), 50);
        assert!(first.iter().all(|p| (0..100).contains(&p.age())));
    }

    #[test]
    fn test_load_people() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "bob", "age": 54, "gender": "MALE"}}, {{"age": 10, "firedNearRetirement": true}}]"#
        )
        .unwrap();

        let people = load_people(file.path()).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name(), Some("bob"));
        assert_eq!(people[0].gender(), Some(Gender::Male));
        assert_eq!(people[1].name(), None);
        assert!(people[1].is_fired_near_retirement());
    }

    #[test]
    fn test_load_people_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_people(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse people"));

        assert!(load_people("/nonexistent/people.json").is_err());
    }
}
