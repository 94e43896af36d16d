mod mutations;
mod planner_api;
mod root_fields;
