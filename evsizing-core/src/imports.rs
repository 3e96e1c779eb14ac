pub(crate) use anyhow::{bail, ensure, Context};
pub(crate) use ndarray::{array, concatenate, s, Array, Array1, Axis};
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use std::ffi::OsStr;
pub(crate) use std::fs::File;
pub(crate) use std::path::Path;

pub(crate) use crate::error::{ModelError, ModelResult};
pub(crate) use crate::params;
pub(crate) use crate::traits::*;
pub(crate) use crate::utils;
