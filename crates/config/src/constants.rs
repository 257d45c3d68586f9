//! Default locations and commands
//!
//! Every value here can be overridden in the configuration file; paths
//! starting with `~` are expanded against the home directory.

pub const BASE_DIR: &str = "~/.relval";
pub const CONFIG_FILE: &str = "~/.relval/relval.toml";
pub const LOG_DIR: &str = "~/.relval/log";
pub const DB_PATH: &str = "~/.relval/status.sqlite";
pub const PID_FILE: &str = "~/.relval/pid";

pub const CATALOG_URL: &str = "http://pcalienbuild4.cern.ch:8889/tarballs";
pub const RESULTS_URL: &str = "http://localhost/$SESSIONTAG";

pub const UNPACK_DIR: &str = "/opt/alice/aliroot/export/arch/$ARCH/Packages/AliRoot/$VERSION";
pub const MODULE_FILE: &str =
    "/opt/alice/aliroot/export/arch/$ARCH/Modules/modulefiles/AliRoot/$VERSION";
pub const UNPACK_CMD: &str =
    "/usr/bin/curl -L $URL | /usr/bin/tar --strip-components=1 -C $DESTDIR -xzvvf -";
pub const RUN_CMD: &str = "/bin/false";
pub const STATUS_CMD: &str = "/bin/false";

pub const MAIL_COMMAND: &str = "/usr/sbin/sendmail -t -i";
pub const MAIL_SENDER: &str = "noreply@localhost";
