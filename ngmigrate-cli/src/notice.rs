//! The postinstall notice printed by `ngmigrate warn`.

use colored::Colorize;
use ngmigrate_domain::maintenance_name;

/// Styled deprecation notice for a package moved into the maintenance scope.
pub fn maintenance_notice(package: &str) -> String {
    let header = format!("WARNING {} (formely {package}):", maintenance_name(package));
    format!(
        "{} This package is part of the {}.\n\
         It receives updates for Angular compatibility only, with no new features or bug fixes.\n\
         Please plan to migrate to an actively supported alternative.",
        header.yellow().bold(),
        "Angular Compatibility Maintenance Initiative".underline(),
    )
}
