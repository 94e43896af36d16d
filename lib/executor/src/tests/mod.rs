mod plan_execution;
mod testkit;
