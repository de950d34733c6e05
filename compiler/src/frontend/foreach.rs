//! Foreach loops
//!
//! Loop annotations decide how a foreach loop is lowered: whether its
//! iterations spawn tasks, how the iteration space is split, and how much
//! the body is unrolled.

use super::{check_not_defined, Annotation, LocalContext, UserError};
use crate::ir::{
    ContVarDefType, ContinuationId, ContinuationType, DefType, ForeachSettings, ProgramBuilder,
    Var, VarStorage, VarType,
};

pub const LOOP_UNROLL: &str = "unroll";
pub const LOOP_SPLIT_DEGREE: &str = "splitdegree";
pub const LOOP_LEAF_DEGREE: &str = "leafdegree";
pub const LOOP_SYNC: &str = "sync";
pub const LOOP_ASYNC: &str = "async";
pub const LOOP_NOSPLIT: &str = "nosplit";

impl ForeachSettings {
    /// Settings for a loop carrying `annotations`
    pub fn from_annotations(annotations: &[Annotation]) -> Result<Self, UserError> {
        let mut settings = ForeachSettings::default();
        let mut flags = Vec::new();

        for annotation in annotations {
            match annotation {
                Annotation::Keyed { key, value } => match key.as_str() {
                    LOOP_UNROLL => settings.unroll = positive_int(key, value)?,
                    LOOP_SPLIT_DEGREE => settings.split_degree = Some(positive_int(key, value)?),
                    LOOP_LEAF_DEGREE => settings.leaf_degree = positive_int(key, value)?,
                    _ => {
                        return Err(UserError::InvalidAnnotation(format!(
                            "{} for foreach loop",
                            annotation
                        )))
                    }
                },
                Annotation::Flag(name) => flags.push(name.clone()),
            }
        }

        for flag in &flags {
            if flag != LOOP_SYNC && flag != LOOP_ASYNC && flag != LOOP_NOSPLIT {
                return Err(UserError::InvalidAnnotation(format!(
                    "@{} for foreach loop",
                    flag
                )));
            }
        }
        let has = |name: &str| flags.iter().any(|f| f == name);
        if has(LOOP_SYNC) && has(LOOP_ASYNC) {
            return Err(UserError::InvalidAnnotation(format!(
                "contradictory loop annotations @{} and @{}",
                LOOP_SYNC, LOOP_ASYNC
            )));
        }
        if has(LOOP_NOSPLIT) {
            settings.split_degree = None;
        }
        settings.spawns_tasks = has(LOOP_ASYNC);
        settings.annotations = flags;
        Ok(settings)
    }
}

fn positive_int(key: &str, value: &str) -> Result<u32, UserError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(UserError::InvalidAnnotation(format!(
            "expected value of {} to be a positive integer",
            key
        ))),
    }
}

/// Foreach loop over a container or an integer range
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachLoop {
    pub member_var_name: String,
    pub count_var_name: Option<String>,
    /// `foreach x in [lo:hi]` rather than over an array
    pub over_range: bool,
    pub settings: ForeachSettings,
}

impl ForeachLoop {
    pub fn new(
        cx: &LocalContext,
        member_var_name: impl Into<String>,
        count_var_name: Option<String>,
        over_range: bool,
        annotations: &[Annotation],
    ) -> Result<Self, UserError> {
        let member_var_name = member_var_name.into();
        let settings = ForeachSettings::from_annotations(annotations)?;
        check_not_defined(cx, &member_var_name)?;
        if let Some(name) = &count_var_name {
            check_not_defined(cx, name)?;
        }
        Ok(Self {
            member_var_name,
            count_var_name,
            over_range,
            settings,
        })
    }

    pub fn is_sync_loop(&self) -> bool {
        self.settings.is_sync_loop()
    }

    pub fn continuation_type(&self) -> ContinuationType {
        if self.over_range {
            ContinuationType::RangeLoop(self.settings.clone())
        } else {
            ContinuationType::ForeachLoop(self.settings.clone())
        }
    }

    /// Range members are fresh temporaries; container members alias the
    /// array element.
    pub fn member_storage(&self) -> VarStorage {
        if self.over_range {
            VarStorage::Temp
        } else {
            VarStorage::Alias
        }
    }

    /// Start the loop in the builder's current block and declare the loop
    /// variables into `cx`. Returns the continuation, the member and the
    /// optional counter.
    pub fn lower(
        &self,
        builder: &mut ProgramBuilder,
        cx: &mut LocalContext,
        array_type: &VarType,
    ) -> Result<(ContinuationId, Var, Option<Var>), UserError> {
        let (key, elem) = array_parts(array_type).ok_or_else(|| {
            UserError::TypeMismatch(format!(
                "expected array type in expression for foreach loop but got type: {}",
                array_type
            ))
        })?;
        let cont = builder
            .build_continuation(self.continuation_type())
            .ok_or_else(|| UserError::OutsideFunction("foreach loop".to_string()))?;

        let member = Var::new(
            self.member_var_name.clone(),
            elem.clone(),
            self.member_storage(),
            DefType::LocalUser,
        );
        let member = define(builder, cx, cont, member)?;

        let counter = match &self.count_var_name {
            Some(name) => {
                let counter = Var::new(
                    name.clone(),
                    value_type(key),
                    VarStorage::Local,
                    DefType::LocalUser,
                );
                Some(define(builder, cx, cont, counter)?)
            }
            None => None,
        };
        Ok((cont, member, counter))
    }
}

fn define(
    builder: &mut ProgramBuilder,
    cx: &mut LocalContext,
    cont: ContinuationId,
    var: Var,
) -> Result<Var, UserError> {
    let var = builder
        .define_construct_var(cont, var, ContVarDefType::NewDef)
        .ok_or_else(|| UserError::OutsideFunction("foreach loop".to_string()))?;
    cx.insert(var.name.clone(), var.clone());
    Ok(var)
}

/// Key and element type of an array or array reference
fn array_parts(ty: &VarType) -> Option<(&VarType, &VarType)> {
    match ty {
        VarType::Array { key, elem } => Some((key, elem)),
        VarType::Ref(inner) => array_parts(inner),
        _ => None,
    }
}

/// Counter variables hold the key as a plain value
fn value_type(key: &VarType) -> VarType {
    match key {
        VarType::Future(s) | VarType::Value(s) => VarType::Value(*s),
        other => other.clone(),
    }
}
