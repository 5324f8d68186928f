pub mod levels;
pub mod lines;
pub mod normalize;
pub mod reader;
pub mod record;

pub use levels::{Level, LevelTable, extract_levels};
pub use lines::{Line, LineTable, extract_lines};
pub use normalize::{DEFAULT_IGNORED_LABELS, NormalizedLevel, NormalizedRow, normalize_rows};
pub use reader::{GfallReader, GfallTables, ReaderConfig};
pub use record::{GFALL_COLUMNS, GFALL_FORTRAN_FORMAT, RawGfallRow, gfall_layout};
