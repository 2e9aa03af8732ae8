use super::*;
use crate::downloader::test_helpers::*;
use crate::types::{RecordId, RunState};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
