mod entries;
mod profiles;

pub(crate) use profiles::ProfileModelV1;
