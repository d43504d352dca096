// document constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: char = '.';
pub const FIELD_REFERENCE: &str = "$";

// update operators
pub const SET: &str = "$set";
pub const SET_ON_INSERT: &str = "$setOnInsert";
pub const UNSET: &str = "$unset";
pub const PUSH: &str = "$push";
pub const PULL: &str = "$pull";
pub const ADD_TO_SET: &str = "$addToSet";
pub const POP: &str = "$pop";
pub const RENAME: &str = "$rename";
pub const EACH: &str = "$each";

// pipeline stages
pub const STAGE_PROJECT: &str = "$project";
pub const STAGE_MATCH: &str = "$match";
pub const STAGE_LIMIT: &str = "$limit";
pub const STAGE_SKIP: &str = "$skip";
pub const STAGE_UNWIND: &str = "$unwind";
pub const STAGE_GROUP: &str = "$group";
pub const STAGE_SORT: &str = "$sort";

// group accumulators
pub const ACC_SUM: &str = "$sum";
pub const ACC_PUSH: &str = "$push";
pub const ACC_AVG: &str = "$avg";
pub const ACC_MIN: &str = "$min";
pub const ACC_MAX: &str = "$max";
pub const ACC_FIRST: &str = "$first";
pub const ACC_LAST: &str = "$last";
pub const ACC_ADD_TO_SET: &str = "$addToSet";

// index options
pub const INDEX_NAME: &str = "name";
pub const INDEX_UNIQUE: &str = "unique";
pub const INDEX_SPARSE: &str = "sparse";
pub const INDEX_LANGUAGE: &str = "language";
pub const INDEX_WEIGHTS: &str = "weights";
pub const TEXT_INDEX_KIND: &str = "text";
pub const DEFAULT_TEXT_WEIGHT: i32 = 1;

// mapper defaults
pub const DEFAULT_PURGE_INTERVAL: usize = 64;

// geo
pub const EARTH_MEAN_RADIUS: f64 = 6_371_009.0;
