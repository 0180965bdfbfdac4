//! Built-in definition set
//!
//! Used when no definitions file is configured.

use serde_json::json;

use crate::error::TaxonomyError;
use crate::registry::TaxonomyDocument;

/// Revision label of the built-in data
pub const BUILTIN_VERSION: &str = "2020-03-23";

const SCHEMA_BASE: &str = "https://linked-data-land.appspot.com/v1/definitions";

/// The built-in definition set
///
/// # Errors
/// Returns error if the embedded data does not match the document shape
pub fn builtin_document() -> Result<TaxonomyDocument, TaxonomyError> {
    let document = json!({
        "version": BUILTIN_VERSION,
        "featureTypes": {
            "people": {
                "id": "34edda82-0f22-4115-b5cf-406db1330436",
                "name": "Person",
                "slug": "people",
                "description": "A person that may be observed",
                "properties": {
                    "profession": {
                        "id": "3eac25e8-a83b-4cf3-a3b0-f9f347c0c1c7",
                        "name": "Profession",
                        "slug": "profession",
                        "description": "Observations about a person's career, skills and profession.",
                        "category": "profession",
                        "propertyTypes": {
                            "role": schemaless("5c1a7e0e-2f1b-4f35-9d7e-0a3f6b2d9c11", "Role", "role",
                                "The role a person holds.")
                        }
                    },
                    "optimism": {
                        "id": "98d1e62b-14c5-487e-bee5-81348edede77",
                        "name": "Optimism",
                        "slug": "optimism",
                        "description": "A person's optimism",
                        "category": "optimism",
                        "propertyTypes": {
                            "learned-optimism": schemaless("0b7f3c52-6a0e-4c8e-8f0b-3e1d2a9c4b01",
                                "Learned Optimism", "learned-optimism",
                                "Scored learned optimism questionnaire."),
                            "learned-optimism-raw": schemaless("0b7f3c52-6a0e-4c8e-8f0b-3e1d2a9c4b02",
                                "Learned Optimism (raw)", "learned-optimism-raw",
                                "Raw answers to the learned optimism questionnaire."),
                            "cave": schemaless("0b7f3c52-6a0e-4c8e-8f0b-3e1d2a9c4b03", "CAVE", "cave",
                                "Content analysis of verbatim explanations.")
                        }
                    },
                    "depression": {
                        "id": "b1f141f6-d957-4006-9b3d-0cc1c883fffe",
                        "name": "Depression",
                        "slug": "depression",
                        "description": "A person's depression",
                        "category": "optimism",
                        "propertyTypes": {
                            "learned-optimism": schemaless("6d2e8a41-93c7-4b0f-a5e2-7f1c0d3b5e01",
                                "Learned Optimism", "learned-optimism",
                                "Depression score derived from the learned optimism questionnaire."),
                            "learned-optimism-raw": schemaless("6d2e8a41-93c7-4b0f-a5e2-7f1c0d3b5e02",
                                "Learned Optimism (raw)", "learned-optimism-raw",
                                "Raw depression answers from the learned optimism questionnaire.")
                        }
                    },
                    "goal": {
                        "id": "4b46d2af-e908-4643-8060-3c85f991a8bf",
                        "name": "Goal",
                        "slug": "goal",
                        "description": "A personal goal",
                        "category": "future",
                        "propertyTypes": {
                            "textual": {
                                "id": "717988a9-f139-4875-b7d7-ac132d7df75b",
                                "name": "Textual Goals",
                                "slug": "textual",
                                "description": "Free form description of a goal.",
                                "schema": textual_goal_schema()
                            },
                            "textual-ref": {
                                "id": "717988a9-f139-4875-b7d7-ac132d7df75c",
                                "name": "Textual Goals (by reference)",
                                "slug": "textual-ref",
                                "description": "Free form goal validated against the published textual goal schema.",
                                "schemaUrl": format!("{SCHEMA_BASE}/people/goal/textual")
                            },
                            "structured": {
                                "id": "9668ea74-9a7d-4665-8e03-402fb39c1365",
                                "name": "Structured Goal",
                                "slug": "structured",
                                "description": "A goal with a series of steps to achieve the goal",
                                "schema": structured_goal_schema()
                            },
                            "daily-goals": {
                                "id": "a41e13a9-d4d6-47f5-b3d6-580a0e0e44d1",
                                "name": "Daily Goals",
                                "slug": "daily-goals",
                                "description": "A set of goals to accomplish for a given day.",
                                "schema": daily_goals_schema()
                            },
                            "daily-goals-result": {
                                "id": "71d6330c-0f02-4ee9-85d5-b27dfa45aab7",
                                "name": "Daily Goals Result",
                                "slug": "daily-goals-result",
                                "description": "A review of a day's goals.",
                                "schema": daily_goals_result_schema()
                            }
                        }
                    },
                    "personality": {
                        "id": "8955d4f2-6968-4548-8ee6-6ae3501b9afe",
                        "name": "Personality",
                        "slug": "personality",
                        "description": "A person's personality",
                        "category": "personality",
                        "propertyTypes": {
                            "sixteen-and-me": schemaless("e3a9b7c4-1d2f-4e5a-8b6c-9d0e1f2a3b01",
                                "16 and Me", "sixteen-and-me", "16 personalities result."),
                            "myers-briggs": schemaless("e3a9b7c4-1d2f-4e5a-8b6c-9d0e1f2a3b02",
                                "Myers-Briggs", "myers-briggs", "Myers-Briggs type indicator.")
                        }
                    }
                }
            },
            "groups": {
                "id": "012c7b88-d55c-4309-98b1-f009f5608f2d",
                "name": "Group",
                "slug": "groups",
                "description": "A group of people",
                "properties": {
                    "safety": {
                        "id": "efc2378a-e325-47af-b4ca-f4ffa3d52afe",
                        "name": "Safety",
                        "slug": "safety",
                        "description": "How safe members of the group feel (from the book Culture Code)",
                        "category": "culture",
                        "propertyTypes": {}
                    },
                    "belonging": {
                        "id": "57f62e37-77dc-4712-ab17-156f31d1ea5e",
                        "name": "Belonging",
                        "slug": "belonging",
                        "description": "The sense of belonging the group members feel to the group (from the book Culture Code)",
                        "category": "culture",
                        "propertyTypes": {}
                    }
                }
            }
        }
    });

    Ok(serde_json::from_value(document)?)
}

fn schemaless(id: &str, name: &str, slug: &str, description: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "slug": slug,
        "description": description
    })
}

fn textual_goal_schema() -> serde_json::Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": format!("{SCHEMA_BASE}/people/goal/textual"),
        "title": "Text Goal",
        "description": "A single goal written as a textual observation",
        "type": "object",
        "additionalProperties": false,
        "required": ["goal"],
        "properties": {
            "goal": {
                "type": "string",
                "title": "The goal",
                "description": "The textual goal.",
                "examples": ["I want to build an awesome observation platform."]
            }
        }
    })
}

fn structured_goal_schema() -> serde_json::Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": format!("{SCHEMA_BASE}/people/goal/structured"),
        "title": "Structured Goal",
        "description": "A goal with a plan of the steps required to accomplish it.",
        "type": "object",
        "additionalProperties": false,
        "required": ["goal", "steps"],
        "properties": {
            "goal": {
                "type": "string",
                "title": "The goal",
                "description": "The textual goal."
            },
            "steps": {
                "type": "array",
                "title": "Steps",
                "description": "The steps required to accomplish this goal.",
                "items": {
                    "type": "object",
                    "required": ["description"],
                    "properties": {
                        "description": {
                            "type": "string",
                            "title": "Step",
                            "description": "A step of the process"
                        },
                        "by": {
                            "type": "string",
                            "format": "date-time",
                            "title": "Due Date",
                            "description": "The date you hope to accomplish this step by."
                        }
                    }
                }
            }
        },
        "examples": [{
            "goal": "I want to build an awesome observation platform.",
            "steps": [
                {"description": "build the platform", "by": "2020-03-29T00:00:00+00:00"},
                {
                    "description": "build a cool implementation using the platform.",
                    "by": "2020-04-10T00:00:00+00:00"
                },
                {
                    "description": "help other people build implementations using the platform.",
                    "by": "2020-05-10T00:00:00+00:00"
                }
            ]
        }]
    })
}

fn daily_goals_schema() -> serde_json::Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": format!("{SCHEMA_BASE}/people/goal/daily-goals"),
        "title": "Daily goals",
        "description": "A list of goals to accomplish in a day",
        "type": "object",
        "additionalProperties": false,
        "required": ["goals", "day"],
        "properties": {
            "goals": {
                "type": "array",
                "items": {
                    "type": "string",
                    "title": "Goal",
                    "description": "One of the goals to accomplish"
                }
            },
            "day": {
                "type": "string",
                "format": "date",
                "title": "Day",
                "description": "The day these goals are relevant"
            }
        },
        "examples": [{
            "goals": [
                "Read a chapter of my book.",
                "Update how validation of observations work.",
                "Vacuum and tidy the house."
            ],
            "day": "2020-03-23"
        }]
    })
}

fn daily_goals_result_schema() -> serde_json::Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": format!("{SCHEMA_BASE}/people/goal/daily-goals-result"),
        "title": "Daily goals result",
        "description": "A review of the day's goals and whether they were accomplished",
        "type": "object",
        "additionalProperties": false,
        "required": ["goals", "day"],
        "properties": {
            "goals": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["goal", "accomplished"],
                    "properties": {
                        "goal": {
                            "type": "string",
                            "title": "Goal",
                            "description": "A description of the goal."
                        },
                        "accomplished": {
                            "type": "boolean",
                            "title": "Accomplished",
                            "description": "Whether the goal was accomplished"
                        }
                    }
                }
            },
            "day": {
                "type": "string",
                "format": "date",
                "title": "Day",
                "description": "The day these goals are relevant"
            }
        },
        "examples": [{
            "goals": [
                {"goal": "Read a chapter of my book", "accomplished": false},
                {"goal": "Update how validation of observations work.", "accomplished": true},
                {"goal": "Vacuum and tidy the house.", "accomplished": true}
            ],
            "day": "2020-03-23"
        }]
    })
}
