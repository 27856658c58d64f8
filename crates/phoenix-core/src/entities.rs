// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only entity records mapped from server payloads.
//!
//! Providers sit at the top of the tenancy hierarchy, companies below them,
//! projects below companies, and users belong to a company. None of these
//! carry behaviour beyond construction-time mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope the server wraps list responses in.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedResponse<T> {
	#[serde(rename = "Data", default = "Vec::new")]
	pub data: Vec<T>,
}

/// A top-level tenancy entity. Providers can contain multiple companies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
	#[serde(rename = "Id")]
	pub id: u64,
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "IsActive", default)]
	pub is_active: bool,
	#[serde(rename = "DateCreated")]
	pub date_created: DateTime<Utc>,
	#[serde(rename = "DateUpdated")]
	pub date_updated: DateTime<Utc>,
}

/// A second-tier tenancy entity under a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
	#[serde(rename = "Id")]
	pub id: u64,
	#[serde(rename = "ProviderId")]
	pub provider_id: u64,
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Reference", default)]
	pub reference: Option<String>,
	#[serde(rename = "IsActive", default)]
	pub is_active: bool,
	#[serde(rename = "DateCreated")]
	pub date_created: DateTime<Utc>,
	#[serde(rename = "DateUpdated")]
	pub date_updated: DateTime<Utc>,
	// MetaDataParameters is the deprecated spelling, kept for compatibility.
	#[serde(rename = "MetaData", alias = "MetaDataParameters", default)]
	pub metadata: Vec<serde_json::Value>,
}

/// A third-tier tenancy entity under a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
	#[serde(rename = "Id")]
	pub id: u64,
	#[serde(rename = "CompanyId")]
	pub company_id: u64,
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Reference", default)]
	pub reference: Option<String>,
	#[serde(rename = "IsActive", default)]
	pub is_active: bool,
	#[serde(rename = "DateCreated")]
	pub date_created: DateTime<Utc>,
	#[serde(rename = "DateUpdated")]
	pub date_updated: DateTime<Utc>,
	#[serde(rename = "MetaData", alias = "MetaDataParameters", default)]
	pub metadata: Vec<serde_json::Value>,
}

/// An authenticated end user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	#[serde(rename = "Id")]
	pub id: u64,
	#[serde(rename = "CompanyId")]
	pub company_id: u64,
	#[serde(rename = "Username")]
	pub username: String,
	#[serde(rename = "FirstName", default)]
	pub first_name: String,
	#[serde(rename = "LastName", default)]
	pub last_name: String,
	#[serde(rename = "IsActive", default)]
	pub is_active: bool,
	#[serde(rename = "DateCreated")]
	pub date_created: DateTime<Utc>,
	#[serde(rename = "DateUpdated")]
	pub date_updated: DateTime<Utc>,
	#[serde(rename = "MetaData", alias = "MetaDataParameters", default)]
	pub metadata: Vec<serde_json::Value>,
}

impl User {
	/// Full displayable name of the user.
	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name)
	}
}
