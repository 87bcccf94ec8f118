// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution for the local engine

use super::error::{SqlError, SqlResult};
use super::parser::{BinaryOp, CreateTable, Expr, Select, SelectItem, Statement, TableRef};
use super::store::{ColumnDef, Store, TableDef, DEFAULT_DATABASE};
use super::types::{compare_values, DataType};
use crate::engine::OutputFormat;
use crate::value::Value;
use std::cmp::Ordering;

/// Rows produced by a query
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Value>>,
    pub rows_read: u64,
    pub bytes_read: u64,
}

impl ResultSet {
    fn single_column(name: &str, values: Vec<String>) -> Self {
        Self {
            columns: vec![ColumnDef {
                name: name.to_string(),
                data_type: DataType::String,
            }],
            rows_read: values.len() as u64,
            rows: values.into_iter().map(|v| vec![Value::String(v)]).collect(),
            bytes_read: 0,
        }
    }
}

/// Outcome of one statement
#[derive(Debug)]
pub enum Outcome {
    /// DDL and INSERT; rendered as an empty buffer
    Done,
    /// Query result with an optional `FORMAT` override
    Rows(ResultSet, Option<OutputFormat>),
}

pub struct Executor<'a> {
    store: &'a Store,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn execute(&self, statement: Statement) -> SqlResult<Outcome> {
        match statement {
            Statement::CreateDatabase { name, if_not_exists } => {
                if !self.store.create_database(&name)? && !if_not_exists {
                    return Err(SqlError::DatabaseExists(name));
                }
                Ok(Outcome::Done)
            }
            Statement::DropDatabase { name, if_exists } => {
                if name == DEFAULT_DATABASE {
                    return Err(SqlError::Unsupported(format!("dropping database {}", name)));
                }
                if !self.store.drop_database(&name)? && !if_exists {
                    return Err(SqlError::UnknownDatabase(name));
                }
                Ok(Outcome::Done)
            }
            Statement::Use(name) => {
                self.store.set_current_database(&name)?;
                Ok(Outcome::Done)
            }
            Statement::CreateTable(create) => self.create_table(create),
            Statement::DropTable { table, if_exists } => {
                let database = self.database_of(&table)?;
                match self.store.table(&database, &table.name)? {
                    Some(def) => self.store.drop_table(&def)?,
                    None if if_exists => {}
                    None => return Err(SqlError::UnknownTable(format!("{}.{}", database, table.name))),
                }
                Ok(Outcome::Done)
            }
            Statement::Truncate(table) => {
                let def = self.resolve(&table)?;
                self.store.truncate(&def)?;
                Ok(Outcome::Done)
            }
            Statement::Insert {
                table,
                columns,
                rows,
            } => self.insert(&table, columns, rows),
            Statement::Select(select) => self.select(select),
            Statement::ShowDatabases => Ok(Outcome::Rows(
                ResultSet::single_column("name", self.store.databases()?),
                None,
            )),
            Statement::ShowTables { database } => {
                let database = match database {
                    Some(db) => db,
                    None => self.store.current_database()?,
                };
                Ok(Outcome::Rows(
                    ResultSet::single_column("name", self.store.tables(&database)?),
                    None,
                ))
            }
        }
    }

    fn database_of(&self, table: &TableRef) -> SqlResult<String> {
        match &table.database {
            Some(db) => Ok(db.clone()),
            None => self.store.current_database(),
        }
    }

    fn resolve(&self, table: &TableRef) -> SqlResult<TableDef> {
        let database = self.database_of(table)?;
        self.store.require_table(&database, &table.name)
    }

    fn create_table(&self, create: CreateTable) -> SqlResult<Outcome> {
        let database = self.database_of(&create.table)?;
        self.store.require_database(&database)?;

        let mut columns: Vec<ColumnDef> = Vec::with_capacity(create.columns.len());
        for spec in create.columns {
            if columns.iter().any(|c| c.name == spec.name) {
                return Err(SqlError::Syntax(format!("column {} specified more than once", spec.name)));
            }
            columns.push(ColumnDef {
                name: spec.name,
                data_type: spec.data_type,
            });
        }
        let order_key = create
            .order_by
            .iter()
            .map(|key| {
                columns
                    .iter()
                    .position(|c| &c.name == key)
                    .ok_or_else(|| SqlError::UnknownColumn(key.clone()))
            })
            .collect::<SqlResult<Vec<usize>>>()?;

        let def = TableDef {
            database,
            name: create.table.name,
            columns,
            engine: create.engine,
            order_key,
        };
        if !self.store.create_table(&def)? && !create.if_not_exists {
            return Err(SqlError::TableExists(def.qualified_name()));
        }
        log::debug!("Created table {} with engine {}", def.qualified_name(), def.engine);
        Ok(Outcome::Done)
    }

    fn insert(
        &self,
        table: &TableRef,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    ) -> SqlResult<Outcome> {
        let def = self.resolve(table)?;
        let targets: Vec<usize> = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    def.column_index(name)
                        .ok_or_else(|| SqlError::UnknownColumn(name.clone()))
                })
                .collect::<SqlResult<_>>()?,
            None => (0..def.columns.len()).collect(),
        };

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != targets.len() {
                return Err(SqlError::Syntax(format!(
                    "expected {} values per row, got {}",
                    targets.len(),
                    row.len()
                )));
            }
            let mut values: Vec<Value> = def.columns.iter().map(|c| c.data_type.default_value()).collect();
            for (expr, &idx) in row.iter().zip(&targets) {
                let value = eval(expr, &[], &[])?;
                values[idx] = def.columns[idx].data_type.coerce(value)?;
            }
            prepared.push(values);
        }

        self.store.insert_rows(&def, &prepared)?;
        log::debug!("Inserted {} rows into {}", prepared.len(), def.qualified_name());
        Ok(Outcome::Done)
    }

    fn select(&self, select: Select) -> SqlResult<Outcome> {
        let (table, source, bytes_read) = match &select.from {
            Some(table) => {
                let def = self.resolve(table)?;
                let (rows, bytes) = self.store.scan(&def)?;
                (Some(def), rows, bytes)
            }
            None => (None, vec![Vec::new()], 0),
        };
        let columns: &[ColumnDef] = table.as_ref().map(|t| t.columns.as_slice()).unwrap_or(&[]);
        let rows_read = if table.is_some() { source.len() as u64 } else { 1 };

        let mut outputs: Vec<(String, Expr)> = Vec::new();
        for item in select.items {
            match item {
                SelectItem::Wildcard => {
                    if columns.is_empty() {
                        return Err(SqlError::Syntax("SELECT * requires a FROM clause".to_string()));
                    }
                    outputs.extend(columns.iter().map(|c| (c.name.clone(), Expr::Column(c.name.clone()))));
                }
                SelectItem::Expr { expr, alias } => {
                    let name = alias.unwrap_or_else(|| expr.display_name());
                    outputs.push((name, expr));
                }
            }
        }

        let result_columns = outputs
            .iter()
            .map(|(name, expr)| {
                Ok(ColumnDef {
                    name: name.clone(),
                    data_type: infer_type(expr, columns)?,
                })
            })
            .collect::<SqlResult<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(source.len());
        for row in source {
            if let Some(filter) = &select.filter {
                if filter.is_aggregate() {
                    return Err(SqlError::Syntax("aggregate function in WHERE".to_string()));
                }
                if truthy(&eval(filter, columns, &row)?)? != Some(true) {
                    continue;
                }
            }
            rows.push(row);
        }

        let mut projected = if outputs.iter().any(|(_, e)| e.is_aggregate()) {
            let row = outputs
                .iter()
                .map(|(_, expr)| {
                    let folded = fold_aggregates(expr, columns, &rows)?;
                    eval(&folded, &[], &[])
                })
                .collect::<SqlResult<Vec<_>>>()?;
            vec![row]
        } else {
            if !select.order_by.is_empty() {
                sort_rows(&mut rows, &select.order_by, &outputs, columns)?;
            }
            rows.iter()
                .map(|row| {
                    outputs
                        .iter()
                        .map(|(_, expr)| eval(expr, columns, row))
                        .collect::<SqlResult<Vec<_>>>()
                })
                .collect::<SqlResult<Vec<_>>>()?
        };

        let offset = (select.offset as usize).min(projected.len());
        projected.drain(..offset);
        if let Some(limit) = select.limit {
            projected.truncate(limit as usize);
        }

        Ok(Outcome::Rows(
            ResultSet {
                columns: result_columns,
                rows: projected,
                rows_read,
                bytes_read,
            },
            select.format,
        ))
    }
}

fn sort_rows(
    rows: &mut Vec<Vec<Value>>,
    order_by: &[super::parser::OrderItem],
    outputs: &[(String, Expr)],
    columns: &[ColumnDef],
) -> SqlResult<()> {
    // Aliases of the select list take precedence over table columns
    let keys: Vec<(&Expr, bool)> = order_by
        .iter()
        .map(|item| {
            let expr = match &item.expr {
                Expr::Column(name) => outputs
                    .iter()
                    .find(|(alias, expr)| alias == name && !matches!(expr, Expr::Column(c) if c == name))
                    .map(|(_, expr)| expr)
                    .unwrap_or(&item.expr),
                other => other,
            };
            (expr, item.descending)
        })
        .collect();

    let mut keyed = rows
        .drain(..)
        .map(|row| {
            let key = keys
                .iter()
                .map(|(expr, _)| eval(expr, columns, &row))
                .collect::<SqlResult<Vec<_>>>()?;
            Ok((key, row))
        })
        .collect::<SqlResult<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| {
        for (i, (_, descending)) in keys.iter().enumerate() {
            let ordering = match (a[i].is_null(), b[i].is_null()) {
                (true, true) => Ordering::Equal,
                // NULLs sort last in both directions
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                (false, false) => {
                    let ordering = compare_values(&a[i], &b[i]).unwrap_or(Ordering::Equal);
                    if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    rows.extend(keyed.into_iter().map(|(_, row)| row));
    Ok(())
}

/// Replace every aggregate call in `expr` by its value over `rows`
fn fold_aggregates(expr: &Expr, columns: &[ColumnDef], rows: &[Vec<Value>]) -> SqlResult<Expr> {
    let fold = |e: &Expr| fold_aggregates(e, columns, rows).map(Box::new);
    match expr {
        Expr::Function { name, args } if super::parser::AGGREGATES.contains(&name.as_str()) => {
            Ok(Expr::Literal(aggregate(name, args, columns, rows)?))
        }
        Expr::Function { name, args } => Ok(Expr::Function {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| fold_aggregates(a, columns, rows))
                .collect::<SqlResult<_>>()?,
        }),
        Expr::Negate(e) => Ok(Expr::Negate(fold(&**e)?)),
        Expr::Not(e) => Ok(Expr::Not(fold(&**e)?)),
        Expr::IsNull { expr, negated } => Ok(Expr::IsNull {
            expr: fold(&**expr)?,
            negated: *negated,
        }),
        Expr::Binary { op, left, right } => Ok(Expr::Binary {
            op: *op,
            left: fold(&**left)?,
            right: fold(&**right)?,
        }),
        Expr::Literal(_) => Ok(expr.clone()),
        Expr::Column(name) => Err(SqlError::Syntax(format!(
            "column {} is not under aggregate function and not in GROUP BY",
            name
        ))),
    }
}

fn aggregate(name: &str, args: &[Expr], columns: &[ColumnDef], rows: &[Vec<Value>]) -> SqlResult<Value> {
    if args.iter().any(Expr::is_aggregate) {
        return Err(SqlError::Syntax(format!(
            "aggregate function {} is found inside another aggregate function",
            name
        )));
    }
    if name == "count" && args.is_empty() {
        return Ok(Value::UInt(rows.len() as u64));
    }
    let [arg] = args else {
        return Err(SqlError::Syntax(format!(
            "aggregate function {} takes exactly one argument",
            name
        )));
    };
    let arg_type = infer_type(arg, columns)?;
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let value = eval(arg, columns, row)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match name {
        "count" => Ok(Value::UInt(values.len() as u64)),
        "sum" => {
            if arg_type.is_float() {
                Ok(Value::Float(values.iter().filter_map(Value::as_f64).sum()))
            } else if arg_type.is_unsigned() {
                Ok(Value::UInt(values.iter().fold(0u64, |acc, v| acc.wrapping_add(integer(v) as u64))))
            } else if arg_type.is_signed() {
                Ok(Value::Int(values.iter().fold(0i64, |acc, v| acc.wrapping_add(integer(v) as i64))))
            } else {
                Err(type_error("sum", &arg_type))
            }
        }
        "avg" => {
            if !arg_type.is_numeric() {
                return Err(type_error("avg", &arg_type));
            }
            let total: f64 = values.iter().filter_map(Value::as_f64).sum();
            Ok(Value::Float(total / values.len() as f64))
        }
        "min" | "max" => {
            let wanted = if name == "min" { Ordering::Less } else { Ordering::Greater };
            let mut best: Option<Value> = None;
            for value in values {
                let replace = match &best {
                    None => true,
                    Some(current) => compare_values(&value, current) == Some(wanted),
                };
                if replace {
                    best = Some(value);
                }
            }
            Ok(best.unwrap_or_else(|| arg_type.default_value()))
        }
        other => Err(SqlError::Unsupported(format!("aggregate function {}", other))),
    }
}

fn type_error(function: &str, ty: &DataType) -> SqlError {
    SqlError::Type(format!("Illegal type {} of argument of function {}", ty, function))
}

/// Static result type of `expr`
pub fn infer_type(expr: &Expr, columns: &[ColumnDef]) -> SqlResult<DataType> {
    let ty = match expr {
        Expr::Literal(value) => DataType::of_literal(value),
        Expr::Column(name) => columns
            .iter()
            .find(|c| &c.name == name)
            .map(|c| c.data_type.clone())
            .ok_or_else(|| SqlError::UnknownColumn(name.clone()))?,
        Expr::Negate(inner) => {
            let inner = infer_type(inner, columns)?;
            if !inner.is_numeric() {
                return Err(type_error("negate", &inner));
            }
            let base = if inner.is_float() { DataType::Float64 } else { DataType::Int64 };
            nullable_like(base, &[&inner])
        }
        Expr::Not(inner) => {
            let inner = infer_type(inner, columns)?;
            nullable_like(DataType::UInt8, &[&inner])
        }
        Expr::IsNull { expr, .. } => {
            infer_type(expr, columns)?;
            DataType::UInt8
        }
        Expr::Binary { op, left, right } => {
            let l = infer_type(left, columns)?;
            let r = infer_type(right, columns)?;
            let base = match op {
                BinaryOp::And | BinaryOp::Or => DataType::UInt8,
                op if op.is_comparison() => DataType::UInt8,
                op => {
                    let numeric = |t: &DataType| t.is_numeric() || *t.base() == DataType::Nothing;
                    if !numeric(&l) || !numeric(&r) {
                        return Err(SqlError::Type(format!(
                            "Illegal types {} and {} of arguments of function {}",
                            l,
                            r,
                            op.function_name()
                        )));
                    }
                    let float = l.is_float() || r.is_float();
                    let unsigned = l.is_unsigned() && r.is_unsigned();
                    match op {
                        BinaryOp::Divide => DataType::Float64,
                        _ if float => DataType::Float64,
                        BinaryOp::Plus | BinaryOp::Multiply | BinaryOp::Modulo if unsigned => DataType::UInt64,
                        _ => DataType::Int64,
                    }
                }
            };
            nullable_like(base, &[&l, &r])
        }
        Expr::Function { name, args } => {
            let arg_types = args
                .iter()
                .map(|a| infer_type(a, columns))
                .collect::<SqlResult<Vec<_>>>()?;
            match name.as_str() {
                "count" => DataType::UInt64,
                "avg" => DataType::Float64,
                "sum" => match arg_types.first() {
                    Some(t) if t.is_float() => DataType::Float64,
                    Some(t) if t.is_unsigned() => DataType::UInt64,
                    Some(t) if t.is_signed() => DataType::Int64,
                    Some(t) => return Err(type_error("sum", t)),
                    None => return Err(SqlError::Syntax("sum requires an argument".to_string())),
                },
                "min" | "max" => arg_types
                    .first()
                    .cloned()
                    .ok_or_else(|| SqlError::Syntax(format!("{} requires an argument", name)))?,
                _ => {
                    let base = scalar_type(name)?;
                    let refs: Vec<&DataType> = arg_types.iter().collect();
                    nullable_like(base, &refs)
                }
            }
        }
    };
    Ok(ty)
}

fn nullable_like(base: DataType, operands: &[&DataType]) -> DataType {
    if operands.iter().any(|t| t.is_nullable()) {
        base.into_nullable()
    } else {
        base
    }
}

fn scalar_type(name: &str) -> SqlResult<DataType> {
    match name {
        "toString" | "lower" | "upper" => Ok(DataType::String),
        "toInt64" => Ok(DataType::Int64),
        "toUInt64" | "length" => Ok(DataType::UInt64),
        "toFloat64" => Ok(DataType::Float64),
        other => Err(SqlError::Unsupported(format!("function {}", other))),
    }
}

/// Evaluate a scalar expression against one row
pub fn eval(expr: &Expr, columns: &[ColumnDef], row: &[Value]) -> SqlResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(name) => columns
            .iter()
            .position(|c| &c.name == name)
            .and_then(|idx| row.get(idx))
            .cloned()
            .ok_or_else(|| SqlError::UnknownColumn(name.clone())),
        Expr::Negate(inner) => match eval(inner, columns, row)? {
            Value::Null => Ok(Value::Null),
            Value::Float(f) => Ok(Value::Float(-f)),
            v @ (Value::Int(_) | Value::UInt(_) | Value::Bool(_)) => Ok(Value::Int((integer(&v) as i64).wrapping_neg())),
            other => Err(SqlError::Type(format!("cannot negate {} '{}'", other.kind(), other))),
        },
        Expr::Not(inner) => {
            let value = eval(inner, columns, row)?;
            Ok(match truthy(&value)? {
                None => Value::Null,
                Some(b) => Value::UInt(!b as u64),
            })
        }
        Expr::IsNull { expr, negated } => {
            let is_null = eval(expr, columns, row)?.is_null();
            Ok(Value::UInt((is_null != *negated) as u64))
        }
        Expr::Binary { op, left, right } => {
            let l = eval(left, columns, row)?;
            let r = eval(right, columns, row)?;
            binary(*op, l, r)
        }
        Expr::Function { name, args } => {
            if super::parser::AGGREGATES.contains(&name.as_str()) {
                return Err(SqlError::Syntax(format!("aggregate function {} is not allowed here", name)));
            }
            let values = args
                .iter()
                .map(|a| eval(a, columns, row))
                .collect::<SqlResult<Vec<_>>>()?;
            scalar(name, values)
        }
    }
}

fn scalar(name: &str, args: Vec<Value>) -> SqlResult<Value> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|args| {
        SqlError::Syntax(format!("function {} takes one argument, got {}", name, args.len()))
    })?;
    if arg.is_null() {
        scalar_type(name)?;
        return Ok(Value::Null);
    }
    match name {
        "toString" => Ok(Value::String(arg.to_string())),
        "toInt64" => match arg {
            Value::Float(f) => DataType::Int64.coerce(Value::Float(f.trunc())),
            other => DataType::Int64.coerce(other),
        },
        "toUInt64" => match arg {
            Value::Float(f) => DataType::UInt64.coerce(Value::Float(f.trunc())),
            other => DataType::UInt64.coerce(other),
        },
        "toFloat64" => DataType::Float64.coerce(arg),
        "length" => match &arg {
            Value::String(s) => Ok(Value::UInt(s.len() as u64)),
            Value::Bytes(b) => Ok(Value::UInt(b.len() as u64)),
            other => Err(SqlError::Type(format!("Illegal type {} of argument of function length", other.kind()))),
        },
        "lower" => Ok(Value::String(arg.to_string().to_lowercase())),
        "upper" => Ok(Value::String(arg.to_string().to_uppercase())),
        other => Err(SqlError::Unsupported(format!("function {}", other))),
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> SqlResult<Value> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let (a, b) = (truthy(&l)?, truthy(&r)?);
            let result = if op == BinaryOp::And {
                match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            } else {
                match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            };
            Ok(result.map(|b| Value::UInt(b as u64)).unwrap_or(Value::Null))
        }
        op if op.is_comparison() => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            let ordering = compare_values(&l, &r).ok_or_else(|| {
                SqlError::Type(format!("cannot compare {} with {}", l.kind(), r.kind()))
            })?;
            let result = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::NotEq => ordering != Ordering::Equal,
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEq => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::UInt(result as u64))
        }
        op => arithmetic(op, l, r),
    }
}

fn arithmetic(op: BinaryOp, l: Value, r: Value) -> SqlResult<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let is_numeric = |v: &Value| matches!(v, Value::Int(_) | Value::UInt(_) | Value::Float(_) | Value::Bool(_));
    if !is_numeric(&l) || !is_numeric(&r) {
        return Err(SqlError::Type(format!(
            "Illegal types {} and {} of arguments of function {}",
            l.kind(),
            r.kind(),
            op.function_name()
        )));
    }

    let float = matches!(l, Value::Float(_)) || matches!(r, Value::Float(_));
    if op == BinaryOp::Divide || float {
        let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
        let result = match op {
            BinaryOp::Plus => a + b,
            BinaryOp::Minus => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Modulo => a % b,
            _ => a / b,
        };
        return Ok(Value::Float(result));
    }

    let unsigned = !matches!(l, Value::Int(_)) && !matches!(r, Value::Int(_));
    let (a, b) = (integer(&l), integer(&r));
    let result = match op {
        BinaryOp::Plus => a + b,
        BinaryOp::Minus => return Ok(Value::Int((a - b) as i64)),
        BinaryOp::Multiply => a.wrapping_mul(b),
        _ => {
            if b == 0 {
                return Err(SqlError::Type("Division by zero".to_string()));
            }
            a % b
        }
    };
    Ok(if unsigned {
        Value::UInt(result as u64)
    } else {
        Value::Int(result as i64)
    })
}

/// Integer view of a numeric value; floats are truncated
fn integer(value: &Value) -> i128 {
    match value {
        Value::Int(i) => *i as i128,
        Value::UInt(u) => *u as i128,
        Value::Bool(b) => *b as i128,
        Value::Float(f) => *f as i128,
        _ => 0,
    }
}

/// Three-valued truth of a condition
fn truthy(value: &Value) -> SqlResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Int(i) => Ok(Some(*i != 0)),
        Value::UInt(u) => Ok(Some(*u != 0)),
        Value::Float(f) => Ok(Some(*f != 0.0)),
        other => Err(SqlError::Type(format!(
            "Illegal type {} of condition, expected a number",
            other.kind()
        ))),
    }
}
