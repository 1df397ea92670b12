// src/recipe/info.rs

//! Info recipes for captured accounts
//!
//! Conary creates users and groups from `info-<name>` packages rather than
//! from scriptlets. Each captured account with a preferred numeric id becomes
//! one such recipe; accounts without an id cannot be expressed and are left
//! to the conversion report.
//!
//! A user info recipe also provides the user's own group, so a captured
//! group named after a captured user is folded into the user's recipe as
//! `groupid=` instead of getting a recipe of its own.

use crate::recipe::format::{class_name, quote};
use crate::scriptlet::{AccountKind, AccountRecord};

/// A rendered `info-<name>.recipe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRecipe {
    /// Trove name, `info-<account>`
    pub name: String,
    pub text: String,
}

impl InfoRecipe {
    pub fn file_name(&self) -> String {
        format!("{}.recipe", self.name)
    }
}

/// Quoted string argument with `%` protected from macro expansion
fn literal(value: &str) -> String {
    quote(&value.replace('%', "%%"))
}

/// Info recipes for a set of captured accounts
#[derive(Debug, Clone, Default)]
pub struct InfoRecipes {
    pub recipes: Vec<InfoRecipe>,
    /// Accounts that could not be rendered for lack of a preferred id
    pub without_id: Vec<AccountRecord>,
}

/// Render info recipes for `records`, folding user-named groups into users
pub fn render_info_recipes(records: &[AccountRecord]) -> InfoRecipes {
    let mut out = InfoRecipes::default();

    let folds_into_user = |group: &AccountRecord| {
        records.iter().any(|user| {
            user.kind == AccountKind::User
                && user.name == group.name
                && user.preferred_id().is_some()
                && user.primary_group().is_none_or(|g| g == group.name)
        })
    };

    for record in records {
        let rendered = match record.kind {
            AccountKind::Group if folds_into_user(record) => continue,
            AccountKind::Group => render_info_recipe(record, None),
            AccountKind::User => {
                let groupid = records
                    .iter()
                    .find(|g| g.kind == AccountKind::Group && g.name == record.name)
                    .filter(|g| folds_into_user(*g))
                    .and_then(|g| g.preferred_id());
                render_info_recipe(record, groupid)
            }
        };

        match rendered {
            Some(recipe) => out.recipes.push(recipe),
            None => out.without_id.push(record.clone()),
        }
    }

    out
}

/// Render the info recipe for one account; `None` without a preferred id
///
/// `groupid` only applies to users.
pub fn render_info_recipe(record: &AccountRecord, groupid: Option<u32>) -> Option<InfoRecipe> {
    let id = record.preferred_id()?;
    let name = format!("info-{}", record.name);

    let (base, call) = match record.kind {
        AccountKind::User => {
            let mut call = format!("r.User({}, {}", literal(&record.name), id);
            if let Some(group) = record.primary_group() {
                call.push_str(&format!(", group={}", literal(group)));
            }
            if let Some(gid) = groupid {
                call.push_str(&format!(", groupid={}", gid));
            }
            for (keyword, value) in [
                ("homedir", record.home_dir()),
                ("comment", record.comment()),
                ("shell", record.shell()),
            ] {
                if let Some(value) = value {
                    call.push_str(&format!(", {}={}", keyword, literal(value)));
                }
            }
            call.push(')');
            ("UserInfoRecipe", call)
        }
        AccountKind::Group => (
            "GroupInfoRecipe",
            format!("r.Group({}, {})", literal(&record.name), id),
        ),
    };

    let text = format!(
        "class {}({}):\n    name = {}\n    version = '1'\n\n    def setup(r):\n        {}\n",
        class_name(&name, "Recipe"),
        base,
        quote(&name),
        call
    );

    Some(InfoRecipe { name, text })
}
