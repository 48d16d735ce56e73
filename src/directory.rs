//! Well-known directory resolution.
//!
//! Mirrors the native `find_directory` call: a closed set of integer
//! codes names system, common and per-user directory categories, and
//! resolution turns a code into an absolute path on a volume, creating
//! the directory on request.

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::enums::EnumTable;
use crate::error::{Result, StorageError};
use crate::volume::Volume;

/// A well-known directory category.
///
/// Discriminants are the native `directory_which` values: the desktop
/// and trash at the bottom, the shared system tree at 1000, the common
/// (shared, writable) tree at 2000, the per-user tree at 3000 and the
/// global application directories at 4000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DirectoryWhich {
    Desktop = 0,
    Trash = 1,

    System = 1000,
    SystemSystem = 1001,
    SystemAddons = 1002,
    SystemBoot = 1003,
    SystemFonts = 1004,
    SystemLib = 1005,
    SystemServers = 1006,
    SystemApps = 1007,
    SystemBin = 1008,
    SystemEtc = 1009,
    SystemDocumentation = 1010,
    SystemPreferences = 1011,
    SystemTranslators = 1012,
    SystemMediaNodes = 1013,
    SystemSounds = 1014,

    Common = 2000,
    CommonSystem = 2001,
    CommonAddons = 2002,
    CommonBoot = 2003,
    CommonFonts = 2004,
    CommonLib = 2005,
    CommonServers = 2006,
    CommonBin = 2007,
    CommonEtc = 2008,
    CommonDocumentation = 2009,
    CommonSettings = 2010,
    CommonDevelop = 2011,
    CommonLog = 2012,
    CommonSpool = 2013,
    CommonTemp = 2014,
    CommonVar = 2015,
    CommonTranslators = 2016,
    CommonMediaNodes = 2017,
    CommonSounds = 2018,

    User = 3000,
    UserConfig = 3001,
    UserAddons = 3002,
    UserBoot = 3003,
    UserFonts = 3004,
    UserLib = 3005,
    UserSettings = 3006,
    UserDeskbar = 3007,
    UserPrinters = 3008,
    UserTranslators = 3009,
    UserMediaNodes = 3010,
    UserSounds = 3011,

    Apps = 4000,
    Preferences = 4001,
    Utilities = 4002,
}

const DIRECTORY_PAIRS: &[(&str, DirectoryWhich)] = &[
    ("B_DESKTOP_DIRECTORY", DirectoryWhich::Desktop),
    ("B_TRASH_DIRECTORY", DirectoryWhich::Trash),
    ("B_BEOS_DIRECTORY", DirectoryWhich::System),
    ("B_BEOS_SYSTEM_DIRECTORY", DirectoryWhich::SystemSystem),
    ("B_BEOS_ADDONS_DIRECTORY", DirectoryWhich::SystemAddons),
    ("B_BEOS_BOOT_DIRECTORY", DirectoryWhich::SystemBoot),
    ("B_BEOS_FONTS_DIRECTORY", DirectoryWhich::SystemFonts),
    ("B_BEOS_LIB_DIRECTORY", DirectoryWhich::SystemLib),
    ("B_BEOS_SERVERS_DIRECTORY", DirectoryWhich::SystemServers),
    ("B_BEOS_APPS_DIRECTORY", DirectoryWhich::SystemApps),
    ("B_BEOS_BIN_DIRECTORY", DirectoryWhich::SystemBin),
    ("B_BEOS_ETC_DIRECTORY", DirectoryWhich::SystemEtc),
    (
        "B_BEOS_DOCUMENTATION_DIRECTORY",
        DirectoryWhich::SystemDocumentation,
    ),
    (
        "B_BEOS_PREFERENCES_DIRECTORY",
        DirectoryWhich::SystemPreferences,
    ),
    (
        "B_BEOS_TRANSLATORS_DIRECTORY",
        DirectoryWhich::SystemTranslators,
    ),
    (
        "B_BEOS_MEDIA_NODES_DIRECTORY",
        DirectoryWhich::SystemMediaNodes,
    ),
    ("B_BEOS_SOUNDS_DIRECTORY", DirectoryWhich::SystemSounds),
    ("B_COMMON_DIRECTORY", DirectoryWhich::Common),
    ("B_COMMON_SYSTEM_DIRECTORY", DirectoryWhich::CommonSystem),
    ("B_COMMON_ADDONS_DIRECTORY", DirectoryWhich::CommonAddons),
    ("B_COMMON_BOOT_DIRECTORY", DirectoryWhich::CommonBoot),
    ("B_COMMON_FONTS_DIRECTORY", DirectoryWhich::CommonFonts),
    ("B_COMMON_LIB_DIRECTORY", DirectoryWhich::CommonLib),
    ("B_COMMON_SERVERS_DIRECTORY", DirectoryWhich::CommonServers),
    ("B_COMMON_BIN_DIRECTORY", DirectoryWhich::CommonBin),
    ("B_COMMON_ETC_DIRECTORY", DirectoryWhich::CommonEtc),
    (
        "B_COMMON_DOCUMENTATION_DIRECTORY",
        DirectoryWhich::CommonDocumentation,
    ),
    (
        "B_COMMON_SETTINGS_DIRECTORY",
        DirectoryWhich::CommonSettings,
    ),
    ("B_COMMON_DEVELOP_DIRECTORY", DirectoryWhich::CommonDevelop),
    ("B_COMMON_LOG_DIRECTORY", DirectoryWhich::CommonLog),
    ("B_COMMON_SPOOL_DIRECTORY", DirectoryWhich::CommonSpool),
    ("B_COMMON_TEMP_DIRECTORY", DirectoryWhich::CommonTemp),
    ("B_COMMON_VAR_DIRECTORY", DirectoryWhich::CommonVar),
    (
        "B_COMMON_TRANSLATORS_DIRECTORY",
        DirectoryWhich::CommonTranslators,
    ),
    (
        "B_COMMON_MEDIA_NODES_DIRECTORY",
        DirectoryWhich::CommonMediaNodes,
    ),
    ("B_COMMON_SOUNDS_DIRECTORY", DirectoryWhich::CommonSounds),
    ("B_USER_DIRECTORY", DirectoryWhich::User),
    ("B_USER_CONFIG_DIRECTORY", DirectoryWhich::UserConfig),
    ("B_USER_ADDONS_DIRECTORY", DirectoryWhich::UserAddons),
    ("B_USER_BOOT_DIRECTORY", DirectoryWhich::UserBoot),
    ("B_USER_FONTS_DIRECTORY", DirectoryWhich::UserFonts),
    ("B_USER_LIB_DIRECTORY", DirectoryWhich::UserLib),
    ("B_USER_SETTINGS_DIRECTORY", DirectoryWhich::UserSettings),
    ("B_USER_DESKBAR_DIRECTORY", DirectoryWhich::UserDeskbar),
    ("B_USER_PRINTERS_DIRECTORY", DirectoryWhich::UserPrinters),
    (
        "B_USER_TRANSLATORS_DIRECTORY",
        DirectoryWhich::UserTranslators,
    ),
    (
        "B_USER_MEDIA_NODES_DIRECTORY",
        DirectoryWhich::UserMediaNodes,
    ),
    ("B_USER_SOUNDS_DIRECTORY", DirectoryWhich::UserSounds),
    ("B_APPS_DIRECTORY", DirectoryWhich::Apps),
    ("B_PREFERENCES_DIRECTORY", DirectoryWhich::Preferences),
    ("B_UTILITIES_DIRECTORY", DirectoryWhich::Utilities),
];

/// The process-wide `directory_which` table.
///
/// `B_BEOS_DIRECTORY` and `B_SYSTEM_DIRECTORY` share a code natively;
/// the historical name is the one exposed, matching the binding it
/// replaces.
pub static DIRECTORY_WHICH: LazyLock<EnumTable> = LazyLock::new(|| {
    EnumTable::build(
        "directory_which",
        DIRECTORY_PAIRS.iter().map(|&(name, which)| (name, which as i32)),
    )
    .expect("native directory names are unique")
});

impl DirectoryWhich {
    /// The native integer code for this category.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Marshals a native code back into a category.
    ///
    /// Codes absent from the `directory_which` table fail with
    /// `InvalidArgument`.
    pub fn from_code(code: i32) -> Result<Self> {
        DIRECTORY_PAIRS
            .iter()
            .find(|&&(_, which)| which as i32 == code)
            .map(|&(_, which)| which)
            .ok_or_else(|| {
                StorageError::InvalidArgument(format!("unknown directory_which code {code}"))
            })
    }

    /// The category's path relative to its volume root.
    pub fn relative_path(self) -> &'static str {
        match self {
            Self::Desktop => "home/Desktop",
            Self::Trash => "home/Desktop/Trash",

            Self::System => "beos",
            Self::SystemSystem => "beos/system",
            Self::SystemAddons => "beos/system/add-ons",
            Self::SystemBoot => "beos/system/boot",
            Self::SystemFonts => "beos/etc/fonts",
            Self::SystemLib => "beos/system/lib",
            Self::SystemServers => "beos/system/servers",
            Self::SystemApps => "beos/apps",
            Self::SystemBin => "beos/bin",
            Self::SystemEtc => "beos/etc",
            Self::SystemDocumentation => "beos/documentation",
            Self::SystemPreferences => "beos/preferences",
            Self::SystemTranslators => "beos/system/add-ons/Translators",
            Self::SystemMediaNodes => "beos/system/add-ons/media",
            Self::SystemSounds => "beos/etc/sounds",

            Self::Common => "common",
            Self::CommonSystem => "common/system",
            Self::CommonAddons => "common/add-ons",
            Self::CommonBoot => "common/boot",
            Self::CommonFonts => "common/fonts",
            Self::CommonLib => "common/lib",
            Self::CommonServers => "common/servers",
            Self::CommonBin => "common/bin",
            Self::CommonEtc => "common/etc",
            Self::CommonDocumentation => "common/documentation",
            Self::CommonSettings => "common/settings",
            Self::CommonDevelop => "common/develop",
            Self::CommonLog => "common/var/log",
            Self::CommonSpool => "common/var/spool",
            Self::CommonTemp => "common/var/tmp",
            Self::CommonVar => "common/var",
            Self::CommonTranslators => "common/add-ons/Translators",
            Self::CommonMediaNodes => "common/add-ons/media",
            Self::CommonSounds => "common/sounds",

            Self::User => "home",
            Self::UserConfig => "home/config",
            Self::UserAddons => "home/config/add-ons",
            Self::UserBoot => "home/config/boot",
            Self::UserFonts => "home/config/fonts",
            Self::UserLib => "home/config/lib",
            Self::UserSettings => "home/config/settings",
            Self::UserDeskbar => "home/config/be/deskbar",
            Self::UserPrinters => "home/config/settings/printers",
            Self::UserTranslators => "home/config/add-ons/Translators",
            Self::UserMediaNodes => "home/config/add-ons/media",
            Self::UserSounds => "home/config/sounds",

            Self::Apps => "apps",
            Self::Preferences => "preferences",
            Self::Utilities => "utilities",
        }
    }
}

/// Resolves a well-known directory to an absolute path on a volume.
///
/// With no volume the boot volume is used. When `create` is set the
/// directory (and any missing parents) is created before returning, so
/// a successful call guarantees the path exists as a directory; without
/// it the path is returned whether or not it exists yet. Resolution is
/// idempotent and has no side effects beyond the optional creation.
pub fn find_directory(
    which: DirectoryWhich,
    volume: Option<&Volume>,
    create: bool,
) -> Result<PathBuf> {
    let boot;
    let volume = match volume {
        Some(volume) => volume,
        None => {
            boot = Volume::boot()?;
            &boot
        }
    };

    let path = volume.root().join(which.relative_path());
    if create && !path.is_dir() {
        log::debug!("creating well-known directory {}", path.display());
        fs::create_dir_all(&path).map_err(|source| StorageError::DirectoryCreation {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

/// Code-level variant of [`find_directory`] for callers marshaling raw
/// `directory_which` integers.
pub fn find_directory_code(code: i32, volume: Option<&Volume>, create: bool) -> Result<PathBuf> {
    find_directory(DirectoryWhich::from_code(code)?, volume, create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn table_exposes_all_native_names() {
        assert_eq!(DIRECTORY_WHICH.len(), DIRECTORY_PAIRS.len());
        assert_eq!(
            DIRECTORY_WHICH.lookup("B_USER_SETTINGS_DIRECTORY").unwrap(),
            DirectoryWhich::UserSettings.code()
        );
        assert_eq!(DIRECTORY_WHICH.lookup("B_DESKTOP_DIRECTORY").unwrap(), 0);
        assert_eq!(DIRECTORY_WHICH.lookup("B_APPS_DIRECTORY").unwrap(), 4000);
    }

    #[test]
    fn from_code_round_trips() {
        for (_, which) in DIRECTORY_PAIRS {
            assert_eq!(DirectoryWhich::from_code(which.code()).unwrap(), *which);
        }
        let err = DirectoryWhich::from_code(999_999).unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn user_settings_resolves_under_home_config() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        let path = find_directory(DirectoryWhich::UserSettings, Some(&volume), false).unwrap();
        assert!(path.ends_with("home/config/settings"));
        assert!(path.starts_with(volume.root()));
        // Without create, the path is returned but not materialized.
        assert!(!path.exists());
    }

    #[test]
    fn create_makes_directory_and_is_idempotent() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        for (_, which) in DIRECTORY_PAIRS {
            let first = find_directory(*which, Some(&volume), true).unwrap();
            assert!(first.is_dir(), "{first:?} should exist");
            let second = find_directory(*which, Some(&volume), true).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn find_directory_code_validates() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        let path = find_directory_code(
            DirectoryWhich::UserSettings.code(),
            Some(&volume),
            false,
        )
        .unwrap();
        assert!(path.ends_with("home/config/settings"));
        assert!(find_directory_code(424_242, Some(&volume), false).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn creation_failure_carries_os_code() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        let mut perms = std::fs::metadata(dir.path()).unwrap().permissions();
        perms.set_mode(0o500);
        std::fs::set_permissions(dir.path(), perms).unwrap();

        let result = find_directory(DirectoryWhich::UserSettings, Some(&volume), true);

        let mut restore = std::fs::metadata(dir.path()).unwrap().permissions();
        restore.set_mode(0o700);
        std::fs::set_permissions(dir.path(), restore).unwrap();

        match result {
            Err(err @ StorageError::DirectoryCreation { .. }) => {
                assert!(err.os_code().is_some());
            }
            // Root bypasses the permission check; nothing to assert then.
            Ok(path) => assert!(path.is_dir()),
            other => panic!("expected DirectoryCreation, got {other:?}"),
        }
    }
}
