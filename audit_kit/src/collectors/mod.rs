//! # Data Collectors Module

pub mod package_owner;

pub use package_owner::{
    interpret_dpkg_output, parse_dpkg_owner_lines, DpkgOwnerLookup, OwnerLookup,
    OwnerLookupError, PackageOwnerCollector,
};
