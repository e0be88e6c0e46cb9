//! Path resolution: dotted filter paths to relational tables and columns.
//!
//! `resolve_path` walks a collection's field tree along a dotted path,
//! accumulating into the caller's [`QueryPlan`] every join, locale pin, and
//! select column needed to reach the path's final segment, and returns the
//! table/column the external SQL builder should compare against.
//!
//! The walk is a pure computation over the shared read-only schema; all
//! mutable state lives in the per-call plan.

use log::debug;
use serde_json::Value;

use crate::config::{LocalizationConfig, MappingConfig, ALL_LOCALES};
use crate::error::{MappingError, MappingResult};
use crate::query::plan::{ColumnTarget, Join, JoinCondition, QueryPlan};
use crate::schema::collection::{Collection, IdKind, SchemaRegistry};
use crate::schema::field::{
    BlocksField, Field, RelationTarget, RelationshipField, ScalarField, ScalarKind, SelectField,
    Tab,
};
use crate::schema::naming::{
    self, BLOCK_PATH_COLUMN, ID_COLUMN, LOCALE_COLUMN, OVERFLOW_LOCALE_COLUMN,
    OVERFLOW_PARENT_COLUMN, OVERFLOW_PATH_COLUMN, OVERFLOW_VALUE_COLUMN, PARENT_ID_COLUMN,
};

/// How the external SQL builder should address the resolved value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    /// A named column on the resolved table.
    Name(String),
    /// A raw SQL fragment (polymorphic `value` COALESCE across target
    /// foreign keys).
    Raw(String),
    /// Existence marker for `blockType` filters: the caller should emit an
    /// IS NOT NULL check on this column of each joined block table.
    NotNullFixed(String),
    /// Marker for `relationTo` filters: the filter value selects which
    /// target's foreign key column must be populated.
    NotNullByTarget(Vec<String>),
}

impl ColumnRef {
    /// For marker variants, the column a candidate filter value maps to.
    pub fn not_null_column(&self, candidate: &str) -> Option<String> {
        match self {
            ColumnRef::NotNullFixed(column) => Some(column.clone()),
            ColumnRef::NotNullByTarget(slugs) => slugs
                .iter()
                .find(|slug| slug.as_str() == candidate)
                .map(|slug| naming::target_fk_column(slug)),
            _ => None,
        }
    }
}

/// Storage-relevant summary of the field a path resolved to, for operator
/// shaping by the external query builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub kind: ResolvedKind,
    pub localized: bool,
    pub has_many: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Id,
    Scalar(ScalarKind),
    Select,
    Relationship,
    Blocks,
}

impl ResolvedField {
    fn id(id_kind: IdKind) -> Self {
        Self {
            name: ID_COLUMN.to_string(),
            kind: match id_kind {
                IdKind::Number => ResolvedKind::Scalar(ScalarKind::Number),
                IdKind::Text => ResolvedKind::Scalar(ScalarKind::Text),
            },
            localized: false,
            has_many: false,
        }
    }

    fn scalar(field: &ScalarField) -> Self {
        Self {
            name: field.name.clone(),
            kind: ResolvedKind::Scalar(field.kind),
            localized: field.localized,
            has_many: field.has_many,
        }
    }

    fn select(field: &SelectField) -> Self {
        Self {
            name: field.name.clone(),
            kind: ResolvedKind::Select,
            localized: field.localized,
            has_many: field.has_many,
        }
    }

    fn relationship(field: &RelationshipField) -> Self {
        Self {
            name: field.name.clone(),
            kind: ResolvedKind::Relationship,
            localized: field.localized,
            has_many: field.has_many,
        }
    }

    fn blocks(field: &BlocksField) -> Self {
        Self {
            name: field.name.clone(),
            kind: ResolvedKind::Blocks,
            localized: field.localized,
            has_many: true,
        }
    }
}

/// Result of resolving one filter path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    /// Alias-or-name of the table holding the value.
    pub table: String,
    pub column: ColumnRef,
    pub field: ResolvedField,
}

/// Resolve `path` against `collection`, accumulating joins, constraints, and
/// select columns into `plan`.
///
/// `value` is the raw filter value; it is only inspected for `blockType`
/// filters, where it selects which block tables to join. `locale` is the
/// requested locale, with `"all"` suppressing locale equality constraints.
pub fn resolve_path(
    registry: &SchemaRegistry,
    config: &MappingConfig,
    collection: &Collection,
    path: &str,
    value: &Value,
    locale: Option<&str>,
    plan: &mut QueryPlan,
) -> MappingResult<ResolvedColumn> {
    debug!(
        "resolving path '{}' on collection '{}'",
        path, collection.slug
    );
    let table = collection.table_name();
    let resolver = Resolver {
        registry,
        localization: config.localization(),
        value,
        full_path: path,
    };
    resolver.resolve(
        plan,
        Level {
            fields: &collection.fields,
            segments: path.split('.').map(str::to_string).collect(),
            table: table.clone(),
            alias: None,
            root_table: table,
            column_prefix: String::new(),
            constraint_path: String::new(),
            table_suffix: String::new(),
            locale: locale.map(str::to_string),
            id_kind: collection.id_kind,
        },
    )
}

/// Per-call immutable context of a resolution walk.
struct Resolver<'a> {
    registry: &'a SchemaRegistry,
    localization: Option<&'a LocalizationConfig>,
    value: &'a Value,
    full_path: &'a str,
}

/// State of one nesting level of the walk.
struct Level<'a> {
    fields: &'a [Field],
    /// Remaining path segments, head-first.
    segments: Vec<String>,
    /// Base name of the current table.
    table: String,
    /// Alias overriding `table` as the join source, when present.
    alias: Option<String>,
    /// Collection root table; anchor of the `_texts`/`_numbers`/`_rels`
    /// overflow tables.
    root_table: String,
    /// Accumulated group/named-tab column prefix (`meta_seo_`).
    column_prefix: String,
    /// Accumulated dotted path for overflow `path` LIKE matching, with `%.`
    /// wildcards at array/block boundaries.
    constraint_path: String,
    /// Accumulated table-name chain between `table` and a child table
    /// introduced at this level.
    table_suffix: String,
    locale: Option<String>,
    id_kind: IdKind,
}

/// Result of searching one field list for a path segment. Anonymous
/// containers are searched through transparently; named tabs match like
/// fields.
enum Found<'a> {
    Node(&'a Field),
    NamedTab(&'a Tab),
}

fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<Found<'a>> {
    for field in fields {
        match field {
            Field::Row(f) => {
                if let Some(found) = find_field(&f.fields, name) {
                    return Some(found);
                }
            }
            Field::Collapsible(f) => {
                if let Some(found) = find_field(&f.fields, name) {
                    return Some(found);
                }
            }
            Field::Tabs(f) => {
                for tab in &f.tabs {
                    match &tab.name {
                        Some(tab_name) if tab_name == name => return Some(Found::NamedTab(tab)),
                        Some(_) => {}
                        None => {
                            if let Some(found) = find_field(&tab.fields, name) {
                                return Some(found);
                            }
                        }
                    }
                }
            }
            other => {
                if other.name() == Some(name) {
                    return Some(Found::Node(other));
                }
            }
        }
    }
    None
}

fn col(table: impl Into<String>, column: impl Into<String>) -> ColumnTarget {
    ColumnTarget::new(table, column)
}

impl<'a> Resolver<'a> {
    fn resolve(&self, plan: &mut QueryPlan, level: Level<'a>) -> MappingResult<ResolvedColumn> {
        let Some(segment) = level.segments.first().cloned() else {
            return Err(MappingError::FieldNotFound {
                path: self.full_path.to_string(),
            });
        };

        let Some(found) = find_field(level.fields, &segment) else {
            // Bare `id` filters resolve to the current table's primary key.
            if segment == ID_COLUMN {
                let table_ref = level.alias.clone().unwrap_or_else(|| level.table.clone());
                plan.add_select(
                    format!("{}.{ID_COLUMN}", level.table),
                    col(table_ref.clone(), ID_COLUMN),
                );
                return Ok(ResolvedColumn {
                    table: table_ref,
                    column: ColumnRef::Name(ID_COLUMN.to_string()),
                    field: ResolvedField::id(level.id_kind),
                });
            }
            return Err(MappingError::FieldNotFound { path: segment });
        };

        // A locale code directly after a localized field is consumed as the
        // locale from this point on rather than as a path segment.
        let mut segments = level.segments.clone();
        let mut locale = level.locale.clone();
        let field_localized = match &found {
            Found::Node(field) => field.localized(),
            Found::NamedTab(tab) => tab.localized,
        };
        if field_localized {
            if let Some(localization) = self.localization {
                if segments.len() > 1 && localization.has_locale(&segments[1]) {
                    locale = Some(segments.remove(1));
                }
            }
        }

        match found {
            Found::NamedTab(tab) => {
                self.resolve_group_like(plan, level, segments, locale, tab.name.as_deref()
                    .unwrap_or_default(), tab.localized, &tab.fields)
            }
            Found::Node(Field::Group(group)) => self.resolve_group_like(
                plan,
                level,
                segments,
                locale,
                &group.name,
                group.localized,
                &group.fields,
            ),
            Found::Node(Field::Select(field)) if field.has_many => {
                self.resolve_has_many_select(plan, level, locale, field)
            }
            Found::Node(Field::Scalar(field))
                if field.has_many
                    && matches!(field.kind, ScalarKind::Text | ScalarKind::Number) =>
            {
                self.resolve_has_many_scalar(plan, level, locale, field)
            }
            Found::Node(Field::Array(array)) => {
                let child =
                    naming::child_table_name(&level.table, &level.table_suffix, &array.name);
                let parent_ref = level.alias.clone().unwrap_or_else(|| level.table.clone());
                let mut conditions = vec![JoinCondition::Columns {
                    left: col(parent_ref, ID_COLUMN),
                    right: col(child.clone(), PARENT_ID_COLUMN),
                }];
                if array.localized && self.localization.is_some() {
                    if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                        conditions.push(JoinCondition::Value {
                            target: col(child.clone(), LOCALE_COLUMN),
                            value: Value::String(loc.to_string()),
                        });
                        plan.add_constraint(child.clone(), LOCALE_COLUMN, Value::String(loc.to_string()));
                    }
                }
                plan.add_join(Join {
                    table: child.clone(),
                    alias: None,
                    conditions,
                });
                // Wildcard row index: overflow rows under this array match
                // `name.%.rest` regardless of position.
                let constraint_path = format!("{}{}.%.", level.constraint_path, array.name);
                self.resolve(
                    plan,
                    Level {
                        fields: &array.fields,
                        segments: segments[1..].to_vec(),
                        table: child,
                        alias: None,
                        root_table: level.root_table,
                        column_prefix: String::new(),
                        constraint_path,
                        table_suffix: String::new(),
                        locale,
                        id_kind: level.id_kind,
                    },
                )
            }
            Found::Node(Field::Blocks(blocks)) => {
                self.resolve_blocks(plan, level, segments, locale, blocks)
            }
            Found::Node(Field::Relationship(rel)) => {
                self.resolve_relationship(plan, level, segments, locale, rel)
            }
            Found::Node(Field::Scalar(field)) => {
                let descriptor = ResolvedField::scalar(field);
                self.resolve_terminal(plan, level, locale, &field.name, field.localized, descriptor)
            }
            Found::Node(Field::Select(field)) => {
                let descriptor = ResolvedField::select(field);
                self.resolve_terminal(plan, level, locale, &field.name, field.localized, descriptor)
            }
            Found::Node(Field::Row(_) | Field::Collapsible(_) | Field::Tabs(_)) => {
                // find_field never yields anonymous containers directly.
                Err(MappingError::FieldNotFound { path: segment })
            }
        }
    }

    /// Groups and named tabs: consume the segment, extend the column/table
    /// prefix, and (when localized) redirect the remaining walk to the
    /// `_locales` companion of the current table.
    #[allow(clippy::too_many_arguments)]
    fn resolve_group_like(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        segments: Vec<String>,
        locale: Option<String>,
        name: &str,
        localized: bool,
        fields: &'a [Field],
    ) -> MappingResult<ResolvedColumn> {
        let mut table = level.table.clone();
        if localized && self.localization.is_some() {
            if let Some(loc) = locale.as_deref() {
                let locales_table = naming::locales_table_name(&level.table);
                plan.add_join(Join {
                    table: locales_table.clone(),
                    alias: None,
                    conditions: vec![JoinCondition::Columns {
                        left: col(level.table.clone(), ID_COLUMN),
                        right: col(locales_table.clone(), PARENT_ID_COLUMN),
                    }],
                });
                if loc != ALL_LOCALES {
                    plan.add_constraint(
                        locales_table.clone(),
                        LOCALE_COLUMN,
                        Value::String(loc.to_string()),
                    );
                }
                table = locales_table;
            }
        }
        self.resolve(
            plan,
            Level {
                fields,
                segments: segments[1..].to_vec(),
                table,
                alias: level.alias,
                root_table: level.root_table,
                column_prefix: naming::extend_prefix(&level.column_prefix, name),
                constraint_path: format!("{}{}.", level.constraint_path, name),
                table_suffix: format!("{}{}_", level.table_suffix, naming::snake_case(name)),
                locale,
                id_kind: level.id_kind,
            },
        )
    }

    /// Has-many selects live in a dedicated per-field overflow table joined
    /// on parent id.
    fn resolve_has_many_select(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        locale: Option<String>,
        field: &SelectField,
    ) -> MappingResult<ResolvedColumn> {
        let child = naming::child_table_name(&level.table, &level.table_suffix, &field.name);
        let mut conditions = vec![JoinCondition::Columns {
            left: col(level.table.clone(), ID_COLUMN),
            right: col(child.clone(), OVERFLOW_PARENT_COLUMN),
        }];
        if field.localized && self.localization.is_some() {
            if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                conditions.push(JoinCondition::Value {
                    target: col(child.clone(), OVERFLOW_LOCALE_COLUMN),
                    value: Value::String(loc.to_string()),
                });
                plan.add_constraint(
                    child.clone(),
                    OVERFLOW_LOCALE_COLUMN,
                    Value::String(loc.to_string()),
                );
            }
        }
        plan.add_join(Join {
            table: child.clone(),
            alias: None,
            conditions,
        });
        Ok(ResolvedColumn {
            table: child,
            column: ColumnRef::Name(OVERFLOW_VALUE_COLUMN.to_string()),
            field: ResolvedField::select(field),
        })
    }

    /// Has-many text/number scalars live in the shared `_texts`/`_numbers`
    /// tables at the collection root, disambiguated by a LIKE match on the
    /// stored `path` column.
    fn resolve_has_many_scalar(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        locale: Option<String>,
        field: &ScalarField,
    ) -> MappingResult<ResolvedColumn> {
        let table = match field.kind {
            ScalarKind::Number => naming::numbers_table_name(&level.root_table),
            _ => naming::texts_table_name(&level.root_table),
        };
        let mut conditions = vec![
            JoinCondition::Columns {
                left: col(level.root_table.clone(), ID_COLUMN),
                right: col(table.clone(), OVERFLOW_PARENT_COLUMN),
            },
            JoinCondition::PathLike {
                target: col(table.clone(), OVERFLOW_PATH_COLUMN),
                pattern: format!("{}{}", level.constraint_path, field.name),
            },
        ];
        if field.localized && self.localization.is_some() {
            if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                conditions.push(JoinCondition::Value {
                    target: col(table.clone(), OVERFLOW_LOCALE_COLUMN),
                    value: Value::String(loc.to_string()),
                });
                plan.add_constraint(
                    table.clone(),
                    OVERFLOW_LOCALE_COLUMN,
                    Value::String(loc.to_string()),
                );
            }
        }
        plan.add_join(Join {
            table: table.clone(),
            alias: None,
            conditions,
        });
        Ok(ResolvedColumn {
            table,
            column: ColumnRef::Name(OVERFLOW_VALUE_COLUMN.to_string()),
            field: ResolvedField::scalar(field),
        })
    }

    fn resolve_blocks(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        segments: Vec<String>,
        locale: Option<String>,
        field: &'a BlocksField,
    ) -> MappingResult<ResolvedColumn> {
        // `blocks.blockType` existence filter: join every block table the
        // filter value names; the caller turns the marker into an
        // OR-across-blocks IS NOT NULL check.
        if segments.get(1).map(String::as_str) == Some("blockType") {
            let slugs: Vec<&str> = match self.value {
                Value::Array(values) => values.iter().filter_map(Value::as_str).collect(),
                Value::String(slug) => vec![slug.as_str()],
                _ => Vec::new(),
            };
            for slug in slugs {
                let block = field.block(slug).ok_or_else(|| MappingError::UnknownBlock {
                    slug: slug.to_string(),
                    field: field.name.clone(),
                })?;
                let block_table = naming::block_table_name(&level.table, &block.slug);
                let alias = plan.alias_for(&block_table);
                plan.add_join(Join {
                    table: block_table,
                    alias: Some(alias.clone()),
                    conditions: vec![JoinCondition::Columns {
                        left: col(level.table.clone(), ID_COLUMN),
                        right: col(alias.clone(), PARENT_ID_COLUMN),
                    }],
                });
                plan.add_constraint(
                    alias,
                    BLOCK_PATH_COLUMN,
                    Value::String(segments[0].clone()),
                );
            }
            let table_ref = level.alias.clone().unwrap_or_else(|| level.table.clone());
            return Ok(ResolvedColumn {
                table: table_ref,
                column: ColumnRef::NotNullFixed(ID_COLUMN.to_string()),
                field: ResolvedField::blocks(field),
            });
        }

        // General case: try each block's field list in turn. A block that
        // lacks the field is a soft miss, not an error; the plan is rolled
        // back to discard the failed attempt's additions.
        let constraint_path = format!("{}{}.%.", level.constraint_path, field.name);
        for block in &field.blocks {
            let block_table = naming::block_table_name(&level.table, &block.slug);
            let checkpoint = plan.checkpoint();
            let attempt = self.resolve(
                plan,
                Level {
                    fields: &block.fields,
                    segments: segments[1..].to_vec(),
                    table: block_table.clone(),
                    alias: None,
                    root_table: level.root_table.clone(),
                    column_prefix: String::new(),
                    constraint_path: constraint_path.clone(),
                    table_suffix: String::new(),
                    locale: locale.clone(),
                    id_kind: level.id_kind,
                },
            );
            match attempt {
                Ok(resolved) => {
                    let parent_ref = level.alias.clone().unwrap_or_else(|| level.table.clone());
                    let mut conditions = vec![JoinCondition::Columns {
                        left: col(parent_ref, ID_COLUMN),
                        right: col(block_table.clone(), PARENT_ID_COLUMN),
                    }];
                    if field.localized && self.localization.is_some() {
                        if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                            conditions.push(JoinCondition::Value {
                                target: col(block_table.clone(), LOCALE_COLUMN),
                                value: Value::String(loc.to_string()),
                            });
                            plan.add_constraint(
                                block_table.clone(),
                                LOCALE_COLUMN,
                                Value::String(loc.to_string()),
                            );
                        }
                    }
                    plan.add_join(Join {
                        table: block_table,
                        alias: None,
                        conditions,
                    });
                    return Ok(resolved);
                }
                Err(_) => plan.rollback(checkpoint),
            }
        }
        Err(MappingError::FieldNotFound {
            path: self.full_path.to_string(),
        })
    }

    fn resolve_relationship(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        segments: Vec<String>,
        locale: Option<String>,
        field: &'a RelationshipField,
    ) -> MappingResult<ResolvedColumn> {
        let remaining = segments[1..].join(".");

        if field.uses_rels_table() {
            return self.resolve_rels_table(plan, level, segments, locale, field, &remaining);
        }

        // Simple foreign key: the path continues into the target collection
        // (anything beyond the field itself that isn't a bare `.id`).
        if segments.len() > 1 && !(segments.len() == 2 && segments[1] == ID_COLUMN) {
            let RelationTarget::Single(slug) = &field.relation_to else {
                // Polymorphic fields were routed through `_rels` above.
                return Err(MappingError::NotSupported {
                    path: self.full_path.to_string(),
                });
            };
            let column = naming::relationship_fk_column(&level.column_prefix, &field.name);
            let target = self.registry.require(slug)?;
            let target_table = target.table_name();
            let target_alias = plan.alias_for(&target_table);

            if field.localized && self.localization.is_some() {
                // Localized foreign keys live in `_locales`; interpose it
                // between the source row and the target table.
                let locales_table = naming::locales_table_name(&level.root_table);
                let locales_alias = plan.alias_for(&locales_table);
                let mut conditions = vec![JoinCondition::Columns {
                    left: col(locales_alias.clone(), PARENT_ID_COLUMN),
                    right: col(level.root_table.clone(), ID_COLUMN),
                }];
                if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                    conditions.push(JoinCondition::Value {
                        target: col(locales_alias.clone(), LOCALE_COLUMN),
                        value: Value::String(loc.to_string()),
                    });
                }
                plan.add_join(Join {
                    table: locales_table,
                    alias: Some(locales_alias.clone()),
                    conditions,
                });
                plan.add_join(Join {
                    table: target_table.clone(),
                    alias: Some(target_alias.clone()),
                    conditions: vec![JoinCondition::Columns {
                        left: col(locales_alias, column),
                        right: col(target_alias.clone(), ID_COLUMN),
                    }],
                });
            } else {
                let source_ref = level.alias.clone().unwrap_or_else(|| level.table.clone());
                plan.add_join(Join {
                    table: target_table.clone(),
                    alias: Some(target_alias.clone()),
                    conditions: vec![JoinCondition::Columns {
                        left: col(target_alias.clone(), ID_COLUMN),
                        right: col(source_ref, column),
                    }],
                });
            }

            return self.resolve(
                plan,
                Level {
                    fields: &target.fields,
                    segments: segments[1..].to_vec(),
                    table: target_table.clone(),
                    alias: Some(target_alias),
                    root_table: target_table,
                    column_prefix: String::new(),
                    constraint_path: String::new(),
                    table_suffix: String::new(),
                    locale,
                    id_kind: target.id_kind,
                },
            );
        }

        // Terminal single relationship (or `.id` suffix): the foreign key
        // column on the current table, localized like any scalar.
        let fk_name = format!("{}_id", field.name);
        let descriptor = ResolvedField::relationship(field);
        self.resolve_terminal(plan, level, locale, &fk_name, field.localized, descriptor)
    }

    /// Polymorphic and has-many relationships route through the shared
    /// `_rels` table at the collection root.
    #[allow(clippy::too_many_arguments)]
    fn resolve_rels_table(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        segments: Vec<String>,
        locale: Option<String>,
        field: &'a RelationshipField,
        remaining: &str,
    ) -> MappingResult<ResolvedColumn> {
        let rels_table = naming::rels_table_name(&level.root_table);
        let rels_alias = plan.alias_for(&rels_table);
        let parent_ref = level
            .alias
            .clone()
            .unwrap_or_else(|| level.root_table.clone());

        let mut conditions = vec![
            JoinCondition::Columns {
                left: col(parent_ref, ID_COLUMN),
                right: col(rels_alias.clone(), OVERFLOW_PARENT_COLUMN),
            },
            JoinCondition::PathLike {
                target: col(rels_alias.clone(), OVERFLOW_PATH_COLUMN),
                pattern: format!("{}{}", level.constraint_path, field.name),
            },
        ];
        if field.localized && self.localization.is_some() {
            if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                conditions.push(JoinCondition::Value {
                    target: col(rels_alias.clone(), OVERFLOW_LOCALE_COLUMN),
                    value: Value::String(loc.to_string()),
                });
                plan.add_constraint(
                    rels_alias.clone(),
                    OVERFLOW_LOCALE_COLUMN,
                    Value::String(loc.to_string()),
                );
            }
        }
        plan.add_join(Join {
            table: rels_table.clone(),
            alias: Some(rels_alias.clone()),
            conditions,
        });
        plan.add_select(
            format!("{rels_table}.{OVERFLOW_PATH_COLUMN}"),
            col(rels_alias.clone(), OVERFLOW_PATH_COLUMN),
        );

        match &field.relation_to {
            RelationTarget::Single(slug) => {
                let target = self.registry.require(slug)?;
                let target_table = target.table_name();
                let target_alias = plan.alias_for(&target_table);
                let fk_column = naming::target_fk_column(slug);
                plan.add_join(Join {
                    table: target_table.clone(),
                    alias: Some(target_alias.clone()),
                    conditions: vec![JoinCondition::Columns {
                        left: col(target_alias.clone(), ID_COLUMN),
                        right: col(rels_alias.clone(), fk_column.clone()),
                    }],
                });

                if remaining.is_empty() || remaining == ID_COLUMN {
                    return Ok(ResolvedColumn {
                        table: rels_alias,
                        column: ColumnRef::Name(fk_column),
                        field: ResolvedField::relationship(field),
                    });
                }

                self.resolve(
                    plan,
                    Level {
                        fields: &target.fields,
                        segments: segments[1..].to_vec(),
                        table: target_table.clone(),
                        alias: Some(target_alias),
                        root_table: target_table,
                        column_prefix: String::new(),
                        constraint_path: String::new(),
                        table_suffix: String::new(),
                        locale,
                        id_kind: target.id_kind,
                    },
                )
            }
            RelationTarget::Poly(slugs) => match remaining {
                // Ambiguous polymorphic value: COALESCE across every
                // possible target's foreign key, skipping the wrapper for a
                // single-entry target list.
                "value" => {
                    let columns: Vec<String> = slugs
                        .iter()
                        .map(|slug| {
                            format!("\"{rels_alias}\".\"{}\"", naming::target_fk_column(slug))
                        })
                        .collect();
                    let raw = if columns.len() == 1 {
                        columns.into_iter().next().unwrap_or_default()
                    } else {
                        format!("COALESCE({})", columns.join(", "))
                    };
                    Ok(ResolvedColumn {
                        table: rels_alias,
                        column: ColumnRef::Raw(raw),
                        field: ResolvedField::relationship(field),
                    })
                }
                "relationTo" => Ok(ResolvedColumn {
                    table: rels_alias,
                    column: ColumnRef::NotNullByTarget(slugs.clone()),
                    field: ResolvedField::relationship(field),
                }),
                _ => Err(MappingError::NotSupported {
                    path: self.full_path.to_string(),
                }),
            },
        }
    }

    /// Plain terminal: a (possibly prefixed, possibly localized) column on
    /// the current table.
    fn resolve_terminal(
        &self,
        plan: &mut QueryPlan,
        level: Level<'a>,
        locale: Option<String>,
        name: &str,
        localized: bool,
        descriptor: ResolvedField,
    ) -> MappingResult<ResolvedColumn> {
        let mut table = level.table.clone();
        let mut alias = level.alias.clone();

        if localized && self.localization.is_some() {
            // Localized scalars live in `_locales`; it supersedes the base
            // table (and any alias) as the target for the rest of the chain.
            let parent_ref = alias.take().unwrap_or_else(|| table.clone());
            let locales_table = naming::locales_table_name(&table);
            plan.add_join(Join {
                table: locales_table.clone(),
                alias: None,
                conditions: vec![JoinCondition::Columns {
                    left: col(parent_ref, ID_COLUMN),
                    right: col(locales_table.clone(), PARENT_ID_COLUMN),
                }],
            });
            if let Some(loc) = locale.as_deref().filter(|l| *l != ALL_LOCALES) {
                plan.add_constraint(
                    locales_table.clone(),
                    LOCALE_COLUMN,
                    Value::String(loc.to_string()),
                );
            }
            table = locales_table;
        }

        let column = naming::prefixed_column(&level.column_prefix, name);
        let table_ref = alias.unwrap_or_else(|| table.clone());
        plan.add_select(
            format!("{table}.{column}"),
            col(table_ref.clone(), column.clone()),
        );
        Ok(ResolvedColumn {
            table: table_ref,
            column: ColumnRef::Name(column),
            field: descriptor,
        })
    }
}
