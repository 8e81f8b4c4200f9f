use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use progress_core::model::{LessonIndex, SyncSettings, UserId};

use crate::error::RemoteError;

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Server-side record of completed lessons, keyed by user id.
#[async_trait]
pub trait RemoteProgressService: Send + Sync {
    /// Completed lesson indices stored for `user`. Unknown users have none.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport or service failures.
    async fn completed_lessons(&self, user: &UserId) -> Result<Vec<LessonIndex>, RemoteError>;

    /// Append one completed lesson for `user`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport or service failures, or when the
    /// service does not acknowledge the write.
    async fn add_completed_lesson(
        &self,
        user: &UserId,
        lesson: LessonIndex,
    ) -> Result<(), RemoteError>;

    /// Delete every completed lesson for `user`; returns the service's success flag.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport or service failures.
    async fn delete_all_completed_lessons(&self, user: &UserId) -> Result<bool, RemoteError>;
}

//
// ─── GRAPHQL DOCUMENTS ─────────────────────────────────────────────────────────
//

struct Operation {
    name: &'static str,
    document: &'static str,
}

const GET_USER_LESSONS: Operation = Operation {
    name: "GetUserLessons",
    document: r"
query GetUserLessons($userId: ID!) {
  getUserLessons(userId: $userId) {
    userId
    completedLessonIndices
  }
}",
};

const ADD_COMPLETED_LESSON: Operation = Operation {
    name: "AddCompletedLesson",
    document: r"
mutation AddCompletedLesson($userId: ID!, $lessonIndex: Int!) {
  addCompletedLesson(userId: $userId, lessonIndex: $lessonIndex) {
    userId
    completedLessonIndices
  }
}",
};

const DELETE_ALL_COMPLETED_LESSONS: Operation = Operation {
    name: "DeleteAllCompletedLessons",
    document: r"
mutation DeleteAllCompletedLessons($userId: ID!) {
  deleteAllCompletedLessons(userId: $userId) {
    success
  }
}",
};

//
// ─── CLIENT ────────────────────────────────────────────────────────────────────
//

/// GraphQL-over-HTTP client for the progress API.
#[derive(Clone)]
pub struct GraphqlProgressClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GraphqlProgressClient {
    /// Build a client from validated sync settings.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotConfigured` when no endpoint is set.
    pub fn from_settings(client: Client, settings: &SyncSettings) -> Result<Self, RemoteError> {
        let endpoint = settings.endpoint().cloned().ok_or(RemoteError::NotConfigured)?;
        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key().map(str::to_owned),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn execute<V, T>(&self, operation: &Operation, variables: V) -> Result<T, RemoteError>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let mut request = self.client.post(self.endpoint.clone()).json(&GraphqlRequest {
            query: operation.document,
            operation_name: operation.name,
            variables,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }

        let body: GraphqlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            let messages = body
                .errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RemoteError::GraphQl(messages));
        }

        body.data.ok_or(RemoteError::Rejected {
            operation: operation.name,
        })
    }
}

#[async_trait]
impl RemoteProgressService for GraphqlProgressClient {
    async fn completed_lessons(&self, user: &UserId) -> Result<Vec<LessonIndex>, RemoteError> {
        let data: GetUserLessonsData = self
            .execute(&GET_USER_LESSONS, UserVariables { user_id: user })
            .await?;
        Ok(data
            .get_user_lessons
            .and_then(|lessons| lessons.completed_lesson_indices)
            .unwrap_or_default())
    }

    async fn add_completed_lesson(
        &self,
        user: &UserId,
        lesson: LessonIndex,
    ) -> Result<(), RemoteError> {
        let data: AddCompletedLessonData = self
            .execute(
                &ADD_COMPLETED_LESSON,
                AddLessonVariables {
                    user_id: user,
                    lesson_index: lesson,
                },
            )
            .await?;
        match data.add_completed_lesson {
            Some(_) => Ok(()),
            None => Err(RemoteError::Rejected {
                operation: ADD_COMPLETED_LESSON.name,
            }),
        }
    }

    async fn delete_all_completed_lessons(&self, user: &UserId) -> Result<bool, RemoteError> {
        let data: DeleteAllData = self
            .execute(&DELETE_ALL_COMPLETED_LESSONS, UserVariables { user_id: user })
            .await?;
        data.delete_all_completed_lessons
            .map(|result| result.success)
            .ok_or(RemoteError::Rejected {
                operation: DELETE_ALL_COMPLETED_LESSONS.name,
            })
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<V> {
    query: &'static str,
    operation_name: &'static str,
    variables: V,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserVariables<'a> {
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddLessonVariables<'a> {
    user_id: &'a UserId,
    lesson_index: LessonIndex,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserLessons {
    completed_lesson_indices: Option<Vec<LessonIndex>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUserLessonsData {
    get_user_lessons: Option<UserLessons>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCompletedLessonData {
    add_completed_lesson: Option<UserLessons>,
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAllData {
    delete_all_completed_lessons: Option<DeleteResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::SyncSettingsDraft;

    #[test]
    fn unconfigured_settings_are_rejected() {
        let settings = SyncSettingsDraft::new().validate().unwrap();
        let err = GraphqlProgressClient::from_settings(Client::new(), &settings)
            .err()
            .unwrap();
        assert!(matches!(err, RemoteError::NotConfigured));
    }

    #[test]
    fn add_request_uses_camel_case_variables() {
        let user = UserId::new("u-1");
        let body = serde_json::to_value(GraphqlRequest {
            query: ADD_COMPLETED_LESSON.document,
            operation_name: ADD_COMPLETED_LESSON.name,
            variables: AddLessonVariables {
                user_id: &user,
                lesson_index: LessonIndex::new(5),
            },
        })
        .unwrap();
        assert_eq!(body["variables"]["userId"], "u-1");
        assert_eq!(body["variables"]["lessonIndex"], 5);
        assert_eq!(body["operationName"], "AddCompletedLesson");
        assert!(body["query"].as_str().unwrap().contains("addCompletedLesson"));
    }

    #[test]
    fn missing_lesson_record_decodes_as_empty() {
        let body: GraphqlResponse<GetUserLessonsData> =
            serde_json::from_str(r#"{"data":{"getUserLessons":null}}"#).unwrap();
        let data = body.data.unwrap();
        assert!(data.get_user_lessons.is_none());
    }

    #[test]
    fn decodes_lesson_indices() {
        let body: GraphqlResponse<GetUserLessonsData> = serde_json::from_str(
            r#"{"data":{"getUserLessons":{"userId":"u","completedLessonIndices":[0,1,5]}}}"#,
        )
        .unwrap();
        let lessons = body
            .data
            .and_then(|d| d.get_user_lessons)
            .and_then(|l| l.completed_lesson_indices)
            .unwrap();
        assert_eq!(
            lessons,
            vec![LessonIndex::new(0), LessonIndex::new(1), LessonIndex::new(5)]
        );
    }

    #[test]
    fn decodes_error_list() {
        let body: GraphqlResponse<DeleteAllData> = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"Unauthorized"},{"message":"again"}]}"#,
        )
        .unwrap();
        assert!(body.data.is_none());
        assert_eq!(body.errors.len(), 2);
        assert_eq!(body.errors[0].message, "Unauthorized");
    }
}
